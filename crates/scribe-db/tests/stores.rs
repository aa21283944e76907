use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use scribe_db::articles::{ArticleFilter, ArticlePatch, NewArticle};
use scribe_db::filters::Filters;
use scribe_db::users::NewUser;
use scribe_db::{Database, Deadline, ErrorKind, Stores};
use scribe_types::models::{ArticleStatus, User};
use uuid::Uuid;

fn stores() -> Stores {
    Stores::new(Arc::new(Database::open_in_memory().unwrap()))
}

fn deadline() -> Deadline {
    Deadline::after(Duration::from_secs(5))
}

fn register(stores: &Stores, email: &str) -> User {
    stores
        .users
        .create(
            &deadline(),
            &NewUser {
                email: email.into(),
                password_hash: "$argon2id$stub".into(),
                first_name: "Test".into(),
                last_name: "User".into(),
                bio: String::new(),
                profile_picture_url: String::new(),
            },
        )
        .unwrap()
}

fn draft(author_id: Uuid, title: &str, tag_ids: Vec<i64>) -> NewArticle {
    NewArticle {
        author_id,
        title: title.into(),
        content: "body".into(),
        status: ArticleStatus::Draft,
        category_id: None,
        tag_ids,
    }
}

fn make_tags(stores: &Stores, names: &[&str]) -> Vec<i64> {
    names
        .iter()
        .map(|name| stores.tags.create(&deadline(), name).unwrap().id)
        .collect()
}

fn tag_ids_of(stores: &Stores, article_id: Uuid) -> BTreeSet<i64> {
    stores
        .articles
        .get_by_id(&deadline(), article_id)
        .unwrap()
        .tags
        .into_iter()
        .map(|t| t.id)
        .collect()
}

#[test]
fn duplicate_tag_name_keeps_operation_tag() {
    let stores = stores();
    stores.tags.create(&deadline(), "go").unwrap();
    let err = stores.tags.create(&deadline(), "go").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateKey);
    assert_eq!(err.operation(), "tag_create");
}

#[test]
fn missing_rows_are_record_not_found() {
    let stores = stores();
    let err = stores.articles.get_by_id(&deadline(), Uuid::new_v4()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RecordNotFound);

    let err = stores.tags.get_by_name(&deadline(), "absent").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RecordNotFound);
}

#[test]
fn created_tags_read_back_as_a_set() {
    let stores = stores();
    let author = register(&stores, "a@example.com");
    let ids = make_tags(&stores, &["one", "two", "three"]);

    let article = stores
        .articles
        .create(&deadline(), &draft(author.id, "tagged", ids.clone()))
        .unwrap();
    assert_eq!(article.tags.len(), 3);
    assert_eq!(tag_ids_of(&stores, article.id), ids.into_iter().collect());

    let bare = stores
        .articles
        .create(&deadline(), &draft(author.id, "bare", Vec::new()))
        .unwrap();
    assert!(bare.tags.is_empty());
    assert!(tag_ids_of(&stores, bare.id).is_empty());
}

#[test]
fn tag_update_replaces_the_whole_set() {
    let stores = stores();
    let author = register(&stores, "a@example.com");
    let ids = make_tags(&stores, &["one", "two", "three", "four"]);

    let article = stores
        .articles
        .create(&deadline(), &draft(author.id, "tagged", ids[..3].to_vec()))
        .unwrap();

    let patch = ArticlePatch {
        tag_ids: Some(vec![ids[3]]),
        ..Default::default()
    };
    stores.articles.update(&deadline(), article.id, &patch).unwrap();
    assert_eq!(tag_ids_of(&stores, article.id), BTreeSet::from([ids[3]]));

    stores.articles.update(&deadline(), article.id, &patch).unwrap();
    assert_eq!(tag_ids_of(&stores, article.id), BTreeSet::from([ids[3]]));
}

#[test]
fn empty_tag_patch_leaves_associations() {
    let stores = stores();
    let author = register(&stores, "a@example.com");
    let ids = make_tags(&stores, &["one", "two"]);
    let article = stores
        .articles
        .create(&deadline(), &draft(author.id, "tagged", ids.clone()))
        .unwrap();

    let patch = ArticlePatch {
        title: Some("renamed".into()),
        tag_ids: Some(Vec::new()),
        ..Default::default()
    };
    stores.articles.update(&deadline(), article.id, &patch).unwrap();

    let reloaded = stores.articles.get_by_id(&deadline(), article.id).unwrap();
    assert_eq!(reloaded.title, "renamed");
    assert_eq!(reloaded.content, "body");
    assert_eq!(tag_ids_of(&stores, article.id), ids.into_iter().collect());
}

#[test]
fn failed_tag_attach_rolls_back_the_article() {
    let stores = stores();
    let author = register(&stores, "a@example.com");
    let ids = make_tags(&stores, &["one"]);

    let err = stores
        .articles
        .create(&deadline(), &draft(author.id, "orphan", vec![ids[0], 9_999]))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ForeignKeyViolation);
    assert_eq!(err.operation(), "article_attachtags");

    let filter = ArticleFilter {
        author_id: Some(author.id),
        ..Default::default()
    };
    let (articles, meta) = stores
        .articles
        .list(&deadline(), &Filters::default(), &filter)
        .unwrap();
    assert!(articles.is_empty());
    assert_eq!(meta.total_records, 0);
}

#[test]
fn failed_tag_replace_keeps_previous_state() {
    let stores = stores();
    let author = register(&stores, "a@example.com");
    let ids = make_tags(&stores, &["one", "two"]);
    let article = stores
        .articles
        .create(&deadline(), &draft(author.id, "before", ids.clone()))
        .unwrap();

    let patch = ArticlePatch {
        title: Some("after".into()),
        tag_ids: Some(vec![9_999]),
        ..Default::default()
    };
    let err = stores.articles.update(&deadline(), article.id, &patch).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ForeignKeyViolation);

    let reloaded = stores.articles.get_by_id(&deadline(), article.id).unwrap();
    assert_eq!(reloaded.title, "before");
    assert_eq!(tag_ids_of(&stores, article.id), ids.into_iter().collect());
}

#[test]
fn status_transitions_are_guarded() {
    let stores = stores();
    let author = register(&stores, "a@example.com");
    let article = stores
        .articles
        .create(&deadline(), &draft(author.id, "T", Vec::new()))
        .unwrap();
    assert!(article.published_at.is_none());

    let to = |status| ArticlePatch {
        status: Some(status),
        ..Default::default()
    };

    let err = stores
        .articles
        .update(&deadline(), article.id, &to(ArticleStatus::Archived))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CheckConstraint);
    assert_eq!(err.operation(), "article_update");

    stores
        .articles
        .update(&deadline(), article.id, &to(ArticleStatus::Published))
        .unwrap();
    let published = stores.articles.get_by_id(&deadline(), article.id).unwrap();
    assert_eq!(published.status, ArticleStatus::Published);
    let published_at = published.published_at.unwrap();

    let err = stores
        .articles
        .update(&deadline(), article.id, &to(ArticleStatus::Draft))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CheckConstraint);

    stores
        .articles
        .update(&deadline(), article.id, &to(ArticleStatus::Archived))
        .unwrap();
    let archived = stores.articles.get_by_id(&deadline(), article.id).unwrap();
    assert_eq!(archived.status, ArticleStatus::Archived);
    assert_eq!(archived.published_at, Some(published_at));
}

#[test]
fn publishing_requires_title_and_content() {
    let stores = stores();
    let author = register(&stores, "a@example.com");
    let mut new = draft(author.id, "  ", Vec::new());
    new.status = ArticleStatus::Published;

    let err = stores.articles.create(&deadline(), &new).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CheckConstraint);
    assert_eq!(err.operation(), "article_create");
}

#[test]
fn concurrent_email_updates_have_one_winner() {
    let stores = stores();
    register(&stores, "a@example.com");

    let handles: Vec<_> = ["b@example.com", "c@example.com"]
        .into_iter()
        .map(|target| {
            let users = stores.users.clone();
            thread::spawn(move || users.update_email(&deadline(), "a@example.com", target))
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    let loser = results.iter().find_map(|r| r.as_ref().err()).unwrap();
    assert_eq!(loser.kind(), ErrorKind::RecordNotFound);

    let b = stores.users.get_by_email(&deadline(), "b@example.com");
    let c = stores.users.get_by_email(&deadline(), "c@example.com");
    assert!(b.is_ok() ^ c.is_ok());
    assert!(stores.users.get_by_email(&deadline(), "a@example.com").is_err());
}

#[test]
fn deleting_missing_category_is_record_not_found() {
    let stores = stores();
    let err = stores.categories.delete_by_id(&deadline(), 42).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RecordNotFound);
    assert_eq!(err.operation(), "category_deletebyid");

    let tech = stores.categories.create(&deadline(), "tech").unwrap();
    let removed = stores.categories.delete_by_name(&deadline(), "tech").unwrap();
    assert_eq!(removed.id, tech.id.to_string());
}

#[test]
fn renaming_missing_tag_is_record_not_found() {
    let stores = stores();
    let err = stores.tags.update_name(&deadline(), 7, "rust").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RecordNotFound);
}

#[test]
fn deleting_category_detaches_articles() {
    let stores = stores();
    let author = register(&stores, "a@example.com");
    let tech = stores.categories.create(&deadline(), "tech").unwrap();
    let mut new = draft(author.id, "T", Vec::new());
    new.category_id = Some(tech.id);
    let article = stores.articles.create(&deadline(), &new).unwrap();
    assert_eq!(article.category_id, Some(tech.id));

    stores.categories.delete_by_id(&deadline(), tech.id).unwrap();
    let reloaded = stores.articles.get_by_id(&deadline(), article.id).unwrap();
    assert_eq!(reloaded.category_id, None);
}

#[test]
fn publish_scenario_end_to_end() {
    let stores = stores();
    let author = register(&stores, "a@example.com");
    let tech = stores.categories.create(&deadline(), "tech").unwrap();
    let go = stores.tags.create(&deadline(), "go").unwrap();
    let systems = stores.tags.create(&deadline(), "systems").unwrap();

    let created = stores
        .articles
        .create(
            &deadline(),
            &NewArticle {
                author_id: author.id,
                title: "T".into(),
                content: "C".into(),
                status: ArticleStatus::Published,
                category_id: Some(tech.id),
                tag_ids: vec![go.id, systems.id],
            },
        )
        .unwrap();

    let fetched = stores.articles.get_by_id(&deadline(), created.id).unwrap();
    assert_eq!(fetched.status, ArticleStatus::Published);
    assert!(fetched.published_at.is_some());
    assert_eq!(fetched.category_id, Some(tech.id));
    let names: BTreeSet<_> = fetched.tags.into_iter().map(|t| t.name).collect();
    assert_eq!(names, BTreeSet::from(["go".to_string(), "systems".to_string()]));
}

#[test]
fn listing_paginates_newest_first() {
    let stores = stores();
    let author = register(&stores, "a@example.com");
    let other = register(&stores, "b@example.com");
    let tag = make_tags(&stores, &["t"])[0];
    for i in 0..5 {
        stores
            .articles
            .create(&deadline(), &draft(author.id, &format!("a{i}"), vec![tag]))
            .unwrap();
    }
    stores
        .articles
        .create(&deadline(), &draft(other.id, "b0", Vec::new()))
        .unwrap();

    let filter = ArticleFilter {
        author_id: Some(author.id),
        ..Default::default()
    };
    let (page, meta) = stores
        .articles
        .list(&deadline(), &Filters::new(Some(2), Some(2)), &filter)
        .unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(meta.total_records, 5);
    assert_eq!(meta.last_page, 3);
    assert_eq!(meta.current_page, 2);
    assert!(page.iter().all(|a| a.author_id == author.id));
    assert!(page.iter().all(|a| a.tags.len() == 1));

    let published = ArticleFilter {
        status: Some(ArticleStatus::Published),
        ..Default::default()
    };
    let (none, meta) = stores
        .articles
        .list(&deadline(), &Filters::default(), &published)
        .unwrap();
    assert!(none.is_empty());
    assert_eq!(meta.last_page, 0);
}

#[test]
fn likes_and_saves() {
    let stores = stores();
    let author = register(&stores, "a@example.com");
    let reader = register(&stores, "r@example.com");
    let article = stores
        .articles
        .create(&deadline(), &draft(author.id, "T", Vec::new()))
        .unwrap();

    stores.articles.like(&deadline(), reader.id, article.id).unwrap();
    let err = stores.articles.like(&deadline(), reader.id, article.id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateKey);
    assert_eq!(stores.articles.list_likes(&deadline(), article.id).unwrap().len(), 1);

    let undone = stores.articles.unlike(&deadline(), reader.id, article.id).unwrap();
    assert_eq!(undone.id, article.id.to_string());
    let err = stores.articles.unlike(&deadline(), reader.id, article.id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RecordNotFound);

    stores.articles.save(&deadline(), reader.id, article.id).unwrap();
    let saved = stores.articles.list_saved(&deadline(), reader.id).unwrap();
    assert_eq!(saved[0].article_id, article.id);
    stores.articles.unsave(&deadline(), reader.id, article.id).unwrap();
    assert!(stores.articles.list_saved(&deadline(), reader.id).unwrap().is_empty());

    let err = stores.articles.like(&deadline(), reader.id, Uuid::new_v4()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ForeignKeyViolation);
}

#[test]
fn comments_follow_article_lifecycle() {
    let stores = stores();
    let author = register(&stores, "a@example.com");
    let article = stores
        .articles
        .create(&deadline(), &draft(author.id, "T", Vec::new()))
        .unwrap();

    let first = stores
        .comments
        .create(&deadline(), author.id, article.id, "first")
        .unwrap();
    stores
        .comments
        .create(&deadline(), author.id, article.id, "second")
        .unwrap();
    let err = stores
        .comments
        .create(&deadline(), author.id, article.id, "   ")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CheckConstraint);

    let listed = stores.comments.list_for_article(&deadline(), article.id).unwrap();
    let bodies: Vec<_> = listed.iter().map(|c| c.content.as_str()).collect();
    assert_eq!(bodies, ["first", "second"]);

    stores.comments.delete(&deadline(), first.id).unwrap();
    assert_eq!(
        stores.comments.get_by_id(&deadline(), first.id).unwrap_err().kind(),
        ErrorKind::RecordNotFound
    );

    stores.articles.delete(&deadline(), article.id).unwrap();
    assert!(stores.comments.list_for_article(&deadline(), article.id).unwrap().is_empty());
}

#[test]
fn follow_graph() {
    let stores = stores();
    let a = register(&stores, "a@example.com");
    let b = register(&stores, "b@example.com");

    stores.followers.follow(&deadline(), a.id, b.id).unwrap();
    assert_eq!(
        stores.followers.follow(&deadline(), a.id, b.id).unwrap_err().kind(),
        ErrorKind::DuplicateKey
    );
    assert_eq!(
        stores.followers.follow(&deadline(), a.id, a.id).unwrap_err().kind(),
        ErrorKind::CheckConstraint
    );

    let followers = stores.followers.list_followers(&deadline(), b.id).unwrap();
    assert_eq!(followers.len(), 1);
    assert_eq!(followers[0].follower_id, a.id);
    assert_eq!(stores.followers.list_followed(&deadline(), a.id).unwrap().len(), 1);

    stores.followers.unfollow(&deadline(), a.id, b.id).unwrap();
    assert_eq!(
        stores.followers.unfollow(&deadline(), a.id, b.id).unwrap_err().kind(),
        ErrorKind::RecordNotFound
    );
}

#[test]
fn reset_token_issue_supersedes() {
    let stores = stores();
    let user = register(&stores, "a@example.com");
    let later = Utc::now() + ChronoDuration::minutes(15);

    let first = stores.reset_tokens.issue(&deadline(), user.id, "tok-1", later).unwrap();
    let second = stores.reset_tokens.issue(&deadline(), user.id, "tok-2", later).unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(second.reset_token, "tok-2");
    assert!(!second.used);

    assert_eq!(
        stores.reset_tokens.get_by_token(&deadline(), "tok-1").unwrap_err().kind(),
        ErrorKind::RecordNotFound
    );
    let current = stores.reset_tokens.get_by_user_id(&deadline(), user.id).unwrap();
    assert_eq!(current.reset_token, "tok-2");

    let err = stores
        .reset_tokens
        .create(&deadline(), user.id, "tok-3", later)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateKey);

    stores.reset_tokens.delete_by_token(&deadline(), "tok-2").unwrap();
    assert_eq!(
        stores.reset_tokens.delete_by_user_id(&deadline(), user.id).unwrap_err().kind(),
        ErrorKind::RecordNotFound
    );
}

#[test]
fn reset_token_update_requires_existing_row() {
    let stores = stores();
    let user = register(&stores, "a@example.com");
    let later = Utc::now() + ChronoDuration::minutes(15);

    let err = stores
        .reset_tokens
        .update(&deadline(), user.id, "tok", later)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RecordNotFound);

    stores.reset_tokens.create(&deadline(), user.id, "tok", later).unwrap();
    let updated = stores
        .reset_tokens
        .update(&deadline(), user.id, "tok-new", later)
        .unwrap();
    assert_eq!(updated.reset_token, "tok-new");
}

#[test]
fn reset_token_redeems_once() {
    let stores = stores();
    let user = register(&stores, "a@example.com");
    let later = Utc::now() + ChronoDuration::minutes(15);
    stores.reset_tokens.issue(&deadline(), user.id, "tok", later).unwrap();

    let modified = stores
        .reset_tokens
        .redeem(&deadline(), "tok", "$argon2id$fresh")
        .unwrap();
    assert_eq!(modified.id, user.id.to_string());
    assert_eq!(
        stores.reset_tokens.get_by_token(&deadline(), "tok").unwrap_err().kind(),
        ErrorKind::RecordNotFound
    );
    let reloaded = stores.users.get_by_id(&deadline(), user.id).unwrap();
    assert_eq!(reloaded.password_hash, "$argon2id$fresh");

    let err = stores
        .reset_tokens
        .redeem(&deadline(), "tok", "$argon2id$replayed")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RecordNotFound);
    assert_eq!(err.operation(), "resettoken_redeem");
    let reloaded = stores.users.get_by_id(&deadline(), user.id).unwrap();
    assert_eq!(reloaded.password_hash, "$argon2id$fresh");

    // A new request starts from a clean slate.
    let reissued = stores.reset_tokens.issue(&deadline(), user.id, "tok-2", later).unwrap();
    assert_eq!(reissued.reset_token, "tok-2");
    assert!(!reissued.used);
}

#[test]
fn repeated_tag_ids_attach_once() {
    let stores = stores();
    let author = register(&stores, "a@example.com");
    let ids = make_tags(&stores, &["go", "rust"]);

    let article = stores
        .articles
        .create(&deadline(), &draft(author.id, "T", vec![ids[0], ids[0]]))
        .unwrap();
    assert_eq!(article.tags.len(), 1);
    assert_eq!(tag_ids_of(&stores, article.id), BTreeSet::from([ids[0]]));

    let patch = ArticlePatch {
        tag_ids: Some(vec![ids[1], ids[1], ids[0]]),
        ..Default::default()
    };
    stores.articles.update(&deadline(), article.id, &patch).unwrap();
    assert_eq!(tag_ids_of(&stores, article.id), BTreeSet::from([ids[0], ids[1]]));
}
