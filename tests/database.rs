//! Runs against the PostgreSQL database named by `TEST_DATABASE_URL`.
//!
//! Every test works inside a transaction that is never committed, so the
//! database is left as it was found. Without `TEST_DATABASE_URL` the tests
//! return early.

#[macro_use]
extern crate diesel;

use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard};

use blogapi::database::metadata::metadata;
use blogapi::database::models::blog::{Blog, NewBlog};
use blogapi::database::models::user::{NewUser, User};
use blogapi::migrations::{self, LiveTarget, MigrationError, MigrationTarget, MIGRATIONS};
use chrono::{Duration, Utc};
use diesel::connection::SimpleConnection;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error};
use diesel::sql_types::Text;

// tests that drop tables would deadlock against tests inserting rows
static DATABASE: Mutex<()> = Mutex::new(());

#[derive(QueryableByName)]
struct TableName {
    #[sql_type = "Text"]
    table_name: String,
}

fn connect() -> Option<(MutexGuard<'static, ()>, PgConnection)> {
    dotenv::dotenv().ok();
    let url = match std::env::var("TEST_DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("TEST_DATABASE_URL is not set, skipping");
            return None;
        }
    };

    let guard = DATABASE.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let conn = PgConnection::establish(&url).expect("TEST_DATABASE_URL is unreachable");
    conn.begin_test_transaction().unwrap();
    Some((guard, conn))
}

/// A connection inside a test transaction with every migration applied
fn migrated() -> Option<(MutexGuard<'static, ()>, PgConnection)> {
    let (guard, conn) = connect()?;
    migrations::upgrade(&mut LiveTarget::new(&conn), MIGRATIONS, &metadata()).unwrap();
    Some((guard, conn))
}

fn tables(conn: &PgConnection) -> BTreeSet<String> {
    diesel::sql_query(
        "SELECT table_name::text AS table_name FROM information_schema.tables \
         WHERE table_schema = current_schema()",
    )
    .load::<TableName>(conn)
    .unwrap()
    .into_iter()
    .map(|t| t.table_name)
    .collect()
}

fn user<'a>(email: &'a str) -> NewUser<'a> {
    NewUser {
        email: Some(email),
        name: Some("Test User"),
    }
}

#[test]
fn upgrade_creates_exactly_users_and_blogs() {
    let (_guard, conn) = match connect() {
        Some(c) => c,
        None => return,
    };
    let mut target = LiveTarget::new(&conn);

    // start from an empty schema even if the database was migrated before
    while migrations::downgrade(&mut target, MIGRATIONS).is_ok() {}
    // a failed downgrade rolls the version table back with it
    target.ensure_version_table().unwrap();
    let before = tables(&conn);

    let report = migrations::upgrade(&mut target, MIGRATIONS, &metadata()).unwrap();
    assert_eq!(report.applied.len(), MIGRATIONS.len());
    assert!(report.drift.is_empty());

    let created: BTreeSet<String> = tables(&conn).difference(&before).cloned().collect();
    let expected: BTreeSet<String> = ["blogs", "users"].iter().map(|t| t.to_string()).collect();
    assert_eq!(created, expected);
}

#[test]
fn upgrade_is_idempotent() {
    let (_guard, conn) = match migrated() {
        Some(c) => c,
        None => return,
    };

    let report = migrations::upgrade(&mut LiveTarget::new(&conn), MIGRATIONS, &metadata()).unwrap();
    assert!(report.applied.is_empty());
}

#[test]
fn live_schema_has_no_drift() {
    let (_guard, conn) = match migrated() {
        Some(c) => c,
        None => return,
    };

    let drift = migrations::check(&mut LiveTarget::new(&conn), &metadata()).unwrap();
    assert!(drift.is_empty(), "{:?}", drift);
}

#[test]
fn downgrade_drops_the_tables() {
    let (_guard, conn) = match migrated() {
        Some(c) => c,
        None => return,
    };
    let mut target = LiveTarget::new(&conn);

    let reverted = migrations::downgrade(&mut target, MIGRATIONS).unwrap();
    assert_eq!(reverted.name, "create_users_and_blogs");

    let remaining = tables(&conn);
    assert!(!remaining.contains("users"));
    assert!(!remaining.contains("blogs"));
    assert!(matches!(
        migrations::downgrade(&mut target, MIGRATIONS),
        Err(MigrationError::NothingToRevert)
    ));
}

#[test]
fn duplicate_email_is_rejected() {
    let (_guard, conn) = match migrated() {
        Some(c) => c,
        None => return,
    };

    let first = User::insert(&conn, &user("ada@example.com")).unwrap();
    assert_eq!(User::find_by_email(&conn, "ada@example.com").unwrap(), Some(first.clone()));
    assert_eq!(User::find_by_id(&conn, first.id).unwrap(), Some(first));

    match User::insert(&conn, &user("ada@example.com")) {
        Err(Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {}
        other => panic!("expected a unique violation, got {:?}", other),
    }
}

#[test]
fn users_may_share_a_name() {
    let (_guard, conn) = match migrated() {
        Some(c) => c,
        None => return,
    };

    let a = User::insert(&conn, &user("one@example.com")).unwrap();
    let b = User::insert(&conn, &user("two@example.com")).unwrap();
    assert_ne!(a.id, b.id);
    assert_eq!(a.name, b.name);
}

#[test]
fn duplicate_slug_is_rejected() {
    let (_guard, conn) = match migrated() {
        Some(c) => c,
        None => return,
    };

    Blog::insert(&conn, &NewBlog::new("First", "body").with_slug("hello")).unwrap();
    assert!(Blog::find_by_slug(&conn, "hello").unwrap().is_some());

    match Blog::insert(&conn, &NewBlog::new("Second", "body").with_slug("hello")) {
        Err(Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {}
        other => panic!("expected a unique violation, got {:?}", other),
    }
}

#[test]
fn unknown_author_is_rejected() {
    let (_guard, conn) = match migrated() {
        Some(c) => c,
        None => return,
    };

    let mut orphan = NewBlog::new("Orphan", "body");
    orphan.author_id = Some(-1);

    match Blog::insert(&conn, &orphan) {
        Err(Error::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _)) => {}
        other => panic!("expected a foreign key violation, got {:?}", other),
    }
}

#[test]
fn blog_defaults_are_filled_in() {
    let (_guard, conn) = match migrated() {
        Some(c) => c,
        None => return,
    };

    // a session far from UTC, so a local-time default would be hours off
    conn.batch_execute("SET TIME ZONE 'Asia/Tokyo'").unwrap();
    let blog = Blog::insert(&conn, &NewBlog::new("Defaults", "body")).unwrap();

    assert!(!blog.is_published);
    assert_eq!(blog.author_id, None);
    assert_eq!(blog.slug, None);
    let age = Utc::now().naive_utc() - blog.created_at;
    assert!(age.num_seconds().abs() < Duration::minutes(5).num_seconds(), "{:?}", age);
    assert_eq!(Blog::find_by_id(&conn, blog.id).unwrap(), Some(blog));
}

#[test]
fn blogs_are_listed_by_author() {
    let (_guard, conn) = match migrated() {
        Some(c) => c,
        None => return,
    };

    let author = User::insert(&conn, &user("writer@example.com")).unwrap();
    let other = User::insert(&conn, &user("reader@example.com")).unwrap();
    let first = Blog::insert(&conn, &NewBlog::new("One", "body").written_by(&author)).unwrap();
    let second = Blog::insert(&conn, &NewBlog::new("Two", "body").written_by(&author)).unwrap();
    Blog::insert(&conn, &NewBlog::new("Elsewhere", "body").written_by(&other)).unwrap();

    assert_eq!(Blog::by_author(&conn, &author).unwrap(), vec![first, second]);
}
