diesel::table! {
    clients (id) {
        id -> Uuid,
        owner_id -> Uuid,
        name -> Text,
        phone -> Nullable<Text>,
        wechat -> Nullable<Text>,
        email -> Nullable<Text>,
        source -> Text,
        stage -> Text,
        temperature_score -> Int4,
        temperature_level -> Text,
        interests -> Nullable<Text>,
        personality -> Nullable<Text>,
        unique_qualities -> Nullable<Text>,
        behavior_patterns -> Nullable<Text>,
        investment_profile -> Nullable<Text>,
        tags -> Array<Text>,
        archived -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
        last_interaction_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    stage_transitions (id) {
        id -> Uuid,
        client_id -> Uuid,
        actor_id -> Uuid,
        from_stage -> Text,
        to_stage -> Text,
        occurred_at -> Timestamptz,
    }
}

diesel::table! {
    interaction_log (id) {
        id -> Uuid,
        client_id -> Uuid,
        actor_id -> Uuid,
        entry_type -> Text,
        content -> Text,
        highlights -> Nullable<Text>,
        challenges -> Nullable<Text>,
        next_action -> Nullable<Text>,
        script_used -> Nullable<Text>,
        sentiment -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    daily_reports (id) {
        id -> Uuid,
        owner_id -> Uuid,
        report_date -> Date,
        new_leads -> Int4,
        initial_contacts -> Int4,
        deep_nurturing -> Int4,
        high_intents -> Int4,
        joined_groups -> Int4,
        opened_accounts -> Int4,
        deposited -> Int4,
        total_interactions -> Int4,
        conversions -> Int4,
        notes -> Nullable<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(stage_transitions -> clients (client_id));
diesel::joinable!(interaction_log -> clients (client_id));

diesel::allow_tables_to_appear_in_same_query!(
    clients,
    stage_transitions,
    interaction_log,
    daily_reports,
);
