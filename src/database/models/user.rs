use diesel::{PgConnection, prelude::*};
use serde::{Serialize, Deserialize};
use crate::schema::{users, self};

#[derive(Debug, PartialEq, Eq)]
#[derive(Queryable)]
#[derive(Clone)]
#[derive(Serialize, Deserialize)]
pub struct User {
    pub id: i32,
    pub email: Option<String>,
    pub name: Option<String>,
}

/// Row to insert into `users`, `id` is assigned by the database
#[derive(Insertable)]
#[table_name = "users"]
pub struct NewUser<'a> {
    pub email: Option<&'a str>,
    pub name: Option<&'a str>,
}

impl User {
    /// Inserts a user and returns the stored row.
    ///
    /// A duplicated `email` fails with a
    /// `DatabaseError(DatabaseErrorKind::UniqueViolation, _)`.
    ///
    /// # Example
    /// ```ignore
    /// let user = User::insert(&conn, &NewUser {
    ///     email: Some("ada@example.com"),
    ///     name: Some("Ada"),
    /// })?;
    /// ```
    pub fn insert(conn: &PgConnection, new_user: &NewUser) -> QueryResult<User> {
        diesel::insert_into(schema::users::table)
            .values(new_user)
            .get_result(conn)
    }

    pub fn find_by_id(conn: &PgConnection, user_id: i32) -> QueryResult<Option<User>> {
        use crate::schema::users::dsl::*;

        users.filter(id.eq(user_id)).first::<User>(conn).optional()
    }

    /// Returns the user registered with `address`, if any
    pub fn find_by_email(conn: &PgConnection, address: &str) -> QueryResult<Option<User>> {
        use crate::schema::users::dsl::*;

        users.filter(email.eq(address)).first::<User>(conn).optional()
    }
}
