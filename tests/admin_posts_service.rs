mod support;

use postdesk::application::admin::posts::AdminPostError;
use postdesk::application::pagination::{PageRequest, PostCursor};
use postdesk::domain::slug::SlugError;

use support::{Harness, Race, png_upload, post_input};

const OWNER: i64 = 7;
const OTHER: i64 = 8;

fn field_errors(err: AdminPostError) -> postdesk::domain::validation::FieldErrors {
    match err {
        AdminPostError::Validation(errors) => errors,
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn create_persists_post_and_attaches_tags() {
    let harness = Harness::new();

    let post = harness
        .service
        .create_post(OWNER, post_input("Hello world", "hello-world"))
        .await
        .expect("create post");

    assert_eq!(post.user_id, OWNER);
    assert_eq!(post.slug, "hello-world");
    assert_eq!(post.category_id, 1);
    assert_eq!(harness.repos.tag_ids_for(post.id).await, vec![10, 11]);
}

#[tokio::test]
async fn create_collapses_duplicate_tag_ids() {
    let harness = Harness::new();
    let mut input = post_input("Tags", "tags");
    input.tags = vec!["11".into(), "10".into(), "11".into()];

    let post = harness
        .service
        .create_post(OWNER, input)
        .await
        .expect("create post");

    assert_eq!(harness.repos.tag_ids_for(post.id).await, vec![11, 10]);
}

#[tokio::test]
async fn create_requires_image_or_content() {
    let harness = Harness::new();
    let mut input = post_input("Empty", "empty");
    input.content = None;

    let errors = field_errors(
        harness
            .service
            .create_post(OWNER, input)
            .await
            .expect_err("missing body must fail"),
    );

    assert!(errors.contains("image"));
    assert!(errors.contains("content"));
    assert_eq!(harness.repos.post_count().await, 0);
}

#[tokio::test]
async fn create_with_image_only_is_accepted() {
    let harness = Harness::new();
    let mut input = post_input("Picture", "picture");
    input.content = None;
    input.image = Some(png_upload("cover.png"));

    let post = harness
        .service
        .create_post(OWNER, input)
        .await
        .expect("create post");

    let stored = post.image.expect("image path recorded");
    assert!(stored.starts_with("uploads/"));
    assert!(harness.image_exists(&stored));
}

#[tokio::test]
async fn create_rejects_taken_slug() {
    let harness = Harness::new();
    harness.repos.insert_post(OTHER, "First", "shared").await;

    let errors = field_errors(
        harness
            .service
            .create_post(OWNER, post_input("Second", "shared"))
            .await
            .expect_err("slug collision must fail"),
    );

    assert_eq!(
        errors.messages("slug"),
        ["The slug has already been taken.".to_string()]
    );
}

#[tokio::test]
async fn create_reports_unknown_category_and_tags() {
    let harness = Harness::new();
    let mut input = post_input("Refs", "refs");
    input.category_id = Some("99".into());
    input.tags = vec!["10".into(), "404".into()];

    let errors = field_errors(
        harness
            .service
            .create_post(OWNER, input)
            .await
            .expect_err("unknown references must fail"),
    );

    assert_eq!(
        errors.messages("category_id"),
        ["The selected category id is invalid.".to_string()]
    );
    assert!(errors.contains("tags.1"));
    assert!(!errors.contains("tags.0"));
}

#[tokio::test]
async fn update_keeps_own_slug() {
    let harness = Harness::new();
    let post = harness
        .service
        .create_post(OWNER, post_input("Keep", "keep"))
        .await
        .expect("create post");

    let mut input = post_input("Keep renamed", "keep");
    input.tags = vec!["12".into()];
    let updated = harness
        .service
        .update_post(OWNER, post.id, input)
        .await
        .expect("update with unchanged slug");

    assert_eq!(updated.title, "Keep renamed");
    assert_eq!(harness.repos.tag_ids_for(post.id).await, vec![12]);
}

#[tokio::test]
async fn update_rejects_slug_of_another_post() {
    let harness = Harness::new();
    harness.repos.insert_post(OTHER, "Taken", "taken").await;
    let post = harness
        .service
        .create_post(OWNER, post_input("Mine", "mine"))
        .await
        .expect("create post");

    let errors = field_errors(
        harness
            .service
            .update_post(OWNER, post.id, post_input("Mine", "taken"))
            .await
            .expect_err("slug collision must fail"),
    );
    assert!(errors.contains("slug"));
}

#[tokio::test]
async fn non_owner_cannot_update_or_delete() {
    let harness = Harness::new();
    let post = harness.repos.insert_post(OWNER, "Owned", "owned").await;

    let update = harness
        .service
        .update_post(OTHER, post.id, post_input("Hijack", "hijack"))
        .await;
    assert!(matches!(update, Err(AdminPostError::Forbidden { .. })));

    let delete = harness.service.delete_post(OTHER, post.id).await;
    assert!(matches!(delete, Err(AdminPostError::Forbidden { .. })));
    assert_eq!(harness.repos.post_count().await, 1);

    let edit = harness.service.edit_form(OTHER, post.id).await;
    assert!(matches!(edit, Err(AdminPostError::Forbidden { .. })));
}

#[tokio::test]
async fn missing_post_is_not_found() {
    let harness = Harness::new();

    assert!(matches!(
        harness.service.load_detail(404).await,
        Err(AdminPostError::NotFound)
    ));
    assert!(matches!(
        harness.service.delete_post(OWNER, 404).await,
        Err(AdminPostError::NotFound)
    ));
}

#[tokio::test]
async fn update_with_new_image_removes_the_old_file() {
    let harness = Harness::new();
    let mut input = post_input("Gallery", "gallery");
    input.image = Some(png_upload("first.png"));
    let post = harness
        .service
        .create_post(OWNER, input)
        .await
        .expect("create post");
    let first = post.image.clone().expect("first image");

    let mut input = post_input("Gallery", "gallery");
    input.image = Some(png_upload("second.png"));
    let updated = harness
        .service
        .update_post(OWNER, post.id, input)
        .await
        .expect("update post");
    let second = updated.image.expect("second image");

    assert_ne!(first, second);
    assert!(!harness.image_exists(&first));
    assert!(harness.image_exists(&second));
}

#[tokio::test]
async fn update_without_image_keeps_existing_one() {
    let harness = Harness::new();
    let mut input = post_input("Photo", "photo");
    input.content = None;
    input.image = Some(png_upload("photo.png"));
    let post = harness
        .service
        .create_post(OWNER, input)
        .await
        .expect("create post");

    // the stored image alone satisfies the image-or-content rule
    let mut input = post_input("Photo retitled", "photo");
    input.content = None;
    let updated = harness
        .service
        .update_post(OWNER, post.id, input)
        .await
        .expect("update post");

    assert_eq!(updated.image, post.image);
    assert!(harness.image_exists(post.image.as_deref().expect("image")));
}

#[tokio::test]
async fn slug_race_on_create_removes_the_stored_image() {
    let harness = Harness::new();
    let service = harness.racing_service(Race::TakeSlug("contested".to_string()));
    let mut input = post_input("Contested", "contested");
    input.image = Some(png_upload("cover.png"));

    let errors = field_errors(
        service
            .create_post(OWNER, input)
            .await
            .expect_err("slug taken between check and insert"),
    );

    assert_eq!(
        errors.messages("slug"),
        ["The slug has already been taken.".to_string()]
    );
    assert_eq!(harness.repos.post_count().await, 1);
    assert_eq!(harness.stored_file_count(), 0);
}

#[tokio::test]
async fn slug_race_on_update_keeps_the_previous_image() {
    let harness = Harness::new();
    let mut input = post_input("Cover", "cover");
    input.image = Some(png_upload("first.png"));
    let post = harness
        .service
        .create_post(OWNER, input)
        .await
        .expect("create post");
    let first = post.image.clone().expect("first image");

    let service = harness.racing_service(Race::TakeSlug("cover-renamed".to_string()));
    let mut input = post_input("Cover", "cover-renamed");
    input.image = Some(png_upload("second.png"));
    let errors = field_errors(
        service
            .update_post(OWNER, post.id, input)
            .await
            .expect_err("slug taken between check and update"),
    );

    assert!(errors.contains("slug"));
    assert!(harness.image_exists(&first));
    assert_eq!(harness.stored_file_count(), 1);
    let unchanged = harness.service.load_detail(post.id).await.expect("detail");
    assert_eq!(unchanged.post.slug, "cover");
    assert_eq!(unchanged.post.image.as_deref(), Some(first.as_str()));
}

#[tokio::test]
async fn tag_removed_before_create_leaves_nothing_behind() {
    let harness = Harness::new();
    let service = harness.racing_service(Race::RemoveTag(11));
    let mut input = post_input("Orphan", "orphan");
    input.image = Some(png_upload("orphan.png"));

    let errors = field_errors(
        service
            .create_post(OWNER, input)
            .await
            .expect_err("tag vanished before insert"),
    );

    assert!(errors.contains("tags"));
    assert_eq!(harness.repos.post_count().await, 0);
    assert_eq!(harness.repos.link_count().await, 0);
    assert_eq!(harness.stored_file_count(), 0);

    // the slug is still free once the form is fixed
    let mut retry = post_input("Orphan", "orphan");
    retry.tags = vec!["10".to_string()];
    let post = harness
        .service
        .create_post(OWNER, retry)
        .await
        .expect("retry without the removed tag");
    assert_eq!(post.slug, "orphan");
    assert_eq!(harness.repos.tag_ids_for(post.id).await, vec![10]);
}

#[tokio::test]
async fn tag_removed_before_update_leaves_the_post_unchanged() {
    let harness = Harness::new();
    let mut input = post_input("Stable", "stable");
    input.image = Some(png_upload("stable.png"));
    let post = harness
        .service
        .create_post(OWNER, input)
        .await
        .expect("create post");
    let first = post.image.clone().expect("image");

    let service = harness.racing_service(Race::RemoveTag(12));
    let mut input = post_input("Stable renamed", "stable-renamed");
    input.tags = vec!["12".to_string()];
    input.image = Some(png_upload("replacement.png"));
    let errors = field_errors(
        service
            .update_post(OWNER, post.id, input)
            .await
            .expect_err("tag vanished before update"),
    );

    assert!(errors.contains("tags"));
    let unchanged = harness.service.load_detail(post.id).await.expect("detail");
    assert_eq!(unchanged.post.title, "Stable");
    assert_eq!(unchanged.post.image.as_deref(), Some(first.as_str()));
    assert_eq!(harness.repos.tag_ids_for(post.id).await, vec![10, 11]);
    assert!(harness.image_exists(&first));
    assert_eq!(harness.stored_file_count(), 1);
}

#[tokio::test]
async fn delete_detaches_tags_and_returns_the_post() {
    let harness = Harness::new();
    let keep = harness
        .service
        .create_post(OWNER, post_input("Keep", "keep"))
        .await
        .expect("create post");
    let doomed = harness
        .service
        .create_post(OWNER, post_input("Doomed", "doomed"))
        .await
        .expect("create post");

    let deleted = harness
        .service
        .delete_post(OWNER, doomed.id)
        .await
        .expect("delete post");

    assert_eq!(deleted.title, "Doomed");
    assert_eq!(harness.repos.post_count().await, 1);
    assert!(harness.repos.tag_ids_for(doomed.id).await.is_empty());
    assert_eq!(harness.repos.tag_ids_for(keep.id).await, vec![10, 11]);
}

#[tokio::test]
async fn preview_slug_skips_taken_slugs_unless_ignored() {
    let harness = Harness::new();
    let post = harness.repos.insert_post(OWNER, "Hello World", "hello-world").await;

    let fresh = harness
        .service
        .preview_slug("Hello World", None)
        .await
        .expect("slug");
    assert_eq!(fresh, "hello-world-2");

    let own = harness
        .service
        .preview_slug("Hello World", Some(post.id))
        .await
        .expect("slug");
    assert_eq!(own, "hello-world");
}

#[tokio::test]
async fn preview_slug_rejects_titles_without_letters() {
    let harness = Harness::new();

    let err = harness
        .service
        .preview_slug("   ", None)
        .await
        .expect_err("blank title");
    assert!(matches!(err, AdminPostError::Slug(SlugError::EmptyInput)));
}

#[tokio::test]
async fn listings_page_newest_first_and_filter_by_owner() {
    let harness = Harness::new();
    for index in 0..3 {
        harness
            .repos
            .insert_post(OWNER, &format!("Mine {index}"), &format!("mine-{index}"))
            .await;
    }
    harness.repos.insert_post(OTHER, "Theirs", "theirs").await;

    let first = harness
        .service
        .list(PageRequest::new(2, None))
        .await
        .expect("first page");
    assert_eq!(first.items.len(), 2);
    assert_eq!(first.items[0].slug, "theirs");

    let cursor = PostCursor::decode(first.next_cursor.as_deref().expect("more pages"))
        .expect("cursor decodes");
    let second = harness
        .service
        .list(PageRequest::new(2, Some(cursor)))
        .await
        .expect("second page");
    assert_eq!(second.items.len(), 2);
    assert!(second.next_cursor.is_none());

    let mine = harness
        .service
        .list_for_owner(OWNER, PageRequest::new(20, None))
        .await
        .expect("own posts");
    assert_eq!(mine.items.len(), 3);
    assert!(mine.items.iter().all(|post| post.user_id == OWNER));
}

#[tokio::test]
async fn edit_form_lists_selected_tags_and_choices() {
    let harness = Harness::new();
    let post = harness
        .service
        .create_post(OWNER, post_input("Edit me", "edit-me"))
        .await
        .expect("create post");

    let form = harness
        .service
        .edit_form(OWNER, post.id)
        .await
        .expect("edit form");

    assert_eq!(form.post.id, post.id);
    assert_eq!(form.tag_ids, vec![10, 11]);
    assert_eq!(form.categories.len(), 2);
    assert_eq!(form.tags.len(), 3);
}
