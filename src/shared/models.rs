pub mod schema {
    diesel::table! {
        admins (id) {
            id -> Int4,
            username -> Text,
            created_at -> Timestamptz,
        }
    }

    diesel::table! {
        campaigns (id) {
            id -> Int4,
            name -> Text,
            subject -> Text,
            created_at -> Timestamptz,
        }
    }

    diesel::table! {
        subscribers (id) {
            id -> Int4,
            uuid -> Uuid,
            email -> Text,
            name -> Text,
            created_at -> Timestamptz,
        }
    }

    diesel::table! {
        lists (id) {
            id -> Int4,
            uuid -> Uuid,
            name -> Text,
            #[sql_name = "type"]
            type_ -> Text,
            optin -> Text,
            status -> Text,
            description -> Text,
            category -> Text,
            no_unsubscribe -> Bool,
            no_tracking -> Bool,
            created_at -> Timestamptz,
            updated_at -> Timestamptz,
        }
    }

    diesel::table! {
        subscriber_lists (subscriber_id, list_id) {
            subscriber_id -> Int4,
            list_id -> Int4,
            status -> Text,
            consent_type -> Nullable<Text>,
            consent_source -> Nullable<Text>,
            consent_ip -> Nullable<Text>,
            consent_user_agent -> Nullable<Text>,
            consent_admin_id -> Nullable<Int4>,
            created_at -> Timestamptz,
            updated_at -> Timestamptz,
        }
    }

    diesel::table! {
        delivery_logs (id) {
            id -> Int8,
            campaign_id -> Nullable<Int4>,
            subscriber_id -> Nullable<Int4>,
            list_id -> Nullable<Int4>,
            from_email -> Text,
            to_email -> Text,
            subject -> Text,
            message_id -> Text,
            smtp_response -> Text,
            smtp_code -> Int4,
            status -> Text,
            error -> Nullable<Text>,
            sent_at -> Timestamptz,
            created_at -> Timestamptz,
        }
    }

    diesel::allow_tables_to_appear_in_same_query!(
        campaigns,
        subscribers,
        lists,
        subscriber_lists,
        delivery_logs,
    );
}

pub use schema::*;
