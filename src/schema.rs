table! {
    blogs (id) {
        id -> Int4,
        title -> Varchar,
        content -> Text,
        author_id -> Nullable<Int4>,
        created_at -> Timestamp,
        is_published -> Bool,
        slug -> Nullable<Varchar>,
    }
}

table! {
    users (id) {
        id -> Int4,
        email -> Nullable<Varchar>,
        name -> Nullable<Varchar>,
    }
}

allow_tables_to_appear_in_same_query!(
    blogs,
    users,
);
