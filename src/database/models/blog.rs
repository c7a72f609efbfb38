use chrono::NaiveDateTime;
use diesel::{PgConnection, prelude::*};
use serde::{Serialize, Deserialize};
use crate::schema::{blogs, self};
use super::user::User;

#[derive(Debug, PartialEq, Eq)]
#[derive(Queryable)]
#[derive(Clone)]
#[derive(Serialize, Deserialize)]
pub struct Blog {
    pub id: i32,
    pub title: String,
    pub content: String,
    pub author_id: Option<i32>,
    pub created_at: NaiveDateTime,
    pub is_published: bool,
    pub slug: Option<String>,
}

/// Row to insert into `blogs`.
///
/// `None` in `created_at` or `is_published` renders `DEFAULT`, so the
/// database fills in the UTC insertion time and `false` respectively.
#[derive(Insertable)]
#[table_name = "blogs"]
pub struct NewBlog<'a> {
    pub title: &'a str,
    pub content: &'a str,
    pub author_id: Option<i32>,
    pub created_at: Option<NaiveDateTime>,
    pub is_published: Option<bool>,
    pub slug: Option<&'a str>,
}

impl<'a> NewBlog<'a> {
    /// A blog with only the required columns set
    pub fn new(title: &'a str, content: &'a str) -> Self {
        NewBlog {
            title,
            content,
            author_id: None,
            created_at: None,
            is_published: None,
            slug: None,
        }
    }

    pub fn written_by(mut self, author: &User) -> Self {
        self.author_id = Some(author.id);
        self
    }

    pub fn with_slug(mut self, slug: &'a str) -> Self {
        self.slug = Some(slug);
        self
    }
}

impl Blog {
    /// Inserts a blog and returns the stored row.
    ///
    /// Fails with `UniqueViolation` on a duplicated slug and with
    /// `ForeignKeyViolation` when `author_id` names no user.
    pub fn insert(conn: &PgConnection, new_blog: &NewBlog) -> QueryResult<Blog> {
        diesel::insert_into(schema::blogs::table)
            .values(new_blog)
            .get_result(conn)
    }

    pub fn find_by_id(conn: &PgConnection, blog_id: i32) -> QueryResult<Option<Blog>> {
        use crate::schema::blogs::dsl::*;

        blogs.filter(id.eq(blog_id)).first::<Blog>(conn).optional()
    }

    pub fn find_by_slug(conn: &PgConnection, blog_slug: &str) -> QueryResult<Option<Blog>> {
        use crate::schema::blogs::dsl::*;

        blogs.filter(slug.eq(blog_slug)).first::<Blog>(conn).optional()
    }

    /// All blogs written by `author`, oldest first
    pub fn by_author(conn: &PgConnection, author: &User) -> QueryResult<Vec<Blog>> {
        use crate::schema::blogs::dsl::*;

        blogs
            .filter(author_id.eq(author.id))
            .order((created_at.asc(), id.asc()))
            .load::<Blog>(conn)
    }
}
