//! Integration tests for project creation and the owner's editors.
//!
//! Requests go through the full router with `tower::ServiceExt::oneshot`
//! against in-memory SQLite and a temporary images directory.

mod common;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::http::StatusCode;
use common::*;
use drumbeat::db::{self, PreparationStatus};
use drumbeat::services::{ContactMessage, FollowerMessenger};
use drumbeat::views::urls;
use tower::ServiceExt;

const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR fake image body";

async fn count(app: &TestApp, table: &str) -> i64 {
    let (n,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(&app.pool)
        .await
        .unwrap();
    n
}

// ============================================================================
// Creation
// ============================================================================

#[tokio::test]
async fn test_create_project_redirects_to_show() {
    let app = TestApp::new().await;
    let user = create_test_user(&app.pool, "ada").await;
    let cookie = login(&app.pool, &user).await;

    let response = app
        .send(post_form(
            &urls::create(),
            Some(&cookie),
            &[
                ("name", "Intro to the Open Web"),
                ("short_description", "HTML, CSS and friends"),
                ("long_description", ""),
            ],
        ))
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/projects/intro-to-the-open-web");
    assert_eq!(
        flash_messages(&response),
        vec!["Your new course has been created."]
    );

    assert_eq!(count(&app, "projects").await, 1);
    assert_eq!(count(&app, "pages").await, 1);

    let project = db::get_project_by_slug(&app.pool, "intro-to-the-open-web")
        .await
        .unwrap();
    assert_eq!(project.created_by, user.id);
    let page = db::get_page(&app.pool, project.detailed_description_id.as_deref().unwrap())
        .await
        .unwrap();
    assert_eq!(page.title, "Full Description");
    assert_eq!(page.content, "<p>Please fill out.</p>");
    assert!(!page.listed);
    assert_eq!(page.project_id, project.id);
    assert!(db::get_relationship(&app.pool, &user.id, &project.id)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_create_project_with_invalid_form_rerenders() {
    let app = TestApp::new().await;
    let user = create_test_user(&app.pool, "ada").await;
    let cookie = login(&app.pool, &user).await;

    let response = app
        .send(post_form(
            &urls::create(),
            Some(&cookie),
            &[("name", ""), ("short_description", "Something")],
        ))
        .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = extract_json(response).await;
    assert_eq!(body["view"], "project_create");
    assert_eq!(
        body["messages"][0]["message"],
        "There was a problem creating your course."
    );
    assert!(body["errors"]["name"].is_array());
    assert_eq!(body["form"]["short_description"], "Something");
    assert_eq!(count(&app, "projects").await, 0);
}

#[tokio::test]
async fn test_create_project_requires_session() {
    let app = TestApp::new().await;

    let response = app
        .send(post_form(
            &urls::create(),
            None,
            &[("name", "Web"), ("short_description", "Short")],
        ))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(count(&app, "projects").await, 0);
}

// ============================================================================
// Ownership
// ============================================================================

#[tokio::test]
async fn test_non_owner_cannot_mutate_project() {
    let app = TestApp::new().await;
    let owner = create_test_user(&app.pool, "owner").await;
    let intruder = create_test_user(&app.pool, "intruder").await;
    let fan = create_test_user(&app.pool, "fan").await;
    let project = create_test_project(&app.pool, &owner, "Guarded").await;
    db::create_relationship(&app.pool, &fan.id, &project.id)
        .await
        .unwrap();
    let link = db::create_link(
        &app.pool,
        db::CreateLink {
            id: db::new_id(),
            project_id: project.id.clone(),
            user_id: owner.id.clone(),
            name: "Pad".into(),
            url: "https://pad.example.org".into(),
        },
    )
    .await
    .unwrap();
    let cookie = login(&app.pool, &intruder).await;
    let slug = project.slug.as_str();

    let attempts = vec![
        post_form(
            &urls::edit(slug),
            Some(&cookie),
            &[("name", "Hijacked"), ("short_description", "Mine now")],
        ),
        post_form(
            &urls::edit_links(slug),
            Some(&cookie),
            &[("name", "Spam"), ("url", "https://spam.example")],
        ),
        post_form(&urls::delete_link(slug, &link.id), Some(&cookie), &[]),
        post_form(
            &format!("{}/add", urls::edit_followers(slug)),
            Some(&cookie),
            &[("username", "intruder")],
        ),
        post_form(
            &format!("{}/delete", urls::edit_followers(slug)),
            Some(&cookie),
            &[("follower_id", fan.id.as_str())],
        ),
        post_form(
            &urls::edit_status(slug),
            Some(&cookie),
            &[("preparation_status", "closed")],
        ),
        post_form(
            &urls::contact(slug),
            Some(&cookie),
            &[("subject", "Hi"), ("message", "Follow me")],
        ),
        post_image(
            &urls::edit_image(slug),
            &cookie,
            "logo.png",
            "image/png",
            PNG,
        ),
        post_image(
            &format!("{}/async", urls::edit_image(slug)),
            &cookie,
            "logo.png",
            "image/png",
            PNG,
        ),
        get_request(&urls::edit(slug), Some(&cookie)),
    ];

    for request in attempts {
        let uri = request.uri().to_string();
        let response = app.send(request).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{}", uri);
    }

    let unchanged = db::get_project(&app.pool, &project.id).await.unwrap();
    assert_eq!(unchanged.name, "Guarded");
    assert_eq!(unchanged.preparation_status, "preparing");
    assert!(unchanged.image.is_none());
    assert_eq!(db::list_project_links(&app.pool, &project.id).await.unwrap().len(), 1);
    assert_eq!(db::count_followers(&app.pool, &project.id).await.unwrap(), 2);
    assert!(db::get_relationship(&app.pool, &intruder.id, &project.id)
        .await
        .unwrap()
        .is_none());
    assert_eq!(count(&app, "messages").await, 0);
}

#[tokio::test]
async fn test_editor_on_unknown_project_is_not_found() {
    let app = TestApp::new().await;
    let user = create_test_user(&app.pool, "ada").await;
    let cookie = login(&app.pool, &user).await;

    let response = app
        .send(get_request(&urls::edit("missing"), Some(&cookie)))
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// Summary and status
// ============================================================================

#[tokio::test]
async fn test_owner_updates_summary() {
    let app = TestApp::new().await;
    let owner = create_test_user(&app.pool, "owner").await;
    let project = create_test_project(&app.pool, &owner, "Draft").await;
    let cookie = login(&app.pool, &owner).await;

    let response = app
        .send(post_form(
            &urls::edit(&project.slug),
            Some(&cookie),
            &[
                ("name", "Final Title"),
                ("short_description", "Now with content"),
                ("long_description", "Weekly sessions"),
            ],
        ))
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), urls::edit("draft"));
    assert_eq!(flash_messages(&response), vec!["Course updated!"]);

    let updated = db::get_project(&app.pool, &project.id).await.unwrap();
    assert_eq!(updated.name, "Final Title");
    assert_eq!(updated.long_description, "Weekly sessions");
    // The slug is fixed at creation
    assert_eq!(updated.slug, "draft");
}

#[tokio::test]
async fn test_invalid_summary_edit_rerenders() {
    let app = TestApp::new().await;
    let owner = create_test_user(&app.pool, "owner").await;
    let project = create_test_project(&app.pool, &owner, "Draft").await;
    let cookie = login(&app.pool, &owner).await;

    let response = app
        .send(post_form(
            &urls::edit(&project.slug),
            Some(&cookie),
            &[
                ("name", "   "),
                ("short_description", "Still here"),
                ("long_description", "Changed"),
            ],
        ))
        .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = extract_json(response).await;
    assert_eq!(body["view"], "project_edit_summary");
    assert!(body["errors"]["name"].is_array());
    assert!(body["errors"]["short_description"].is_null());
    assert_eq!(body["form"]["long_description"], "Changed");

    let unchanged = db::get_project(&app.pool, &project.id).await.unwrap();
    assert_eq!(unchanged.name, "Draft");
    assert_eq!(unchanged.long_description, "");
    assert_eq!(unchanged.updated_at, project.updated_at);
}

#[tokio::test]
async fn test_preparation_status_validation() {
    let app = TestApp::new().await;
    let owner = create_test_user(&app.pool, "owner").await;
    let project = create_test_project(&app.pool, &owner, "Status").await;
    let cookie = login(&app.pool, &owner).await;

    let response = app
        .send(post_form(
            &urls::edit_status(&project.slug),
            Some(&cookie),
            &[("preparation_status", "finished")],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = extract_json(response).await;
    assert_eq!(
        body["messages"][0]["message"],
        "There was a problem saving the preparation status."
    );

    let response = app
        .send(post_form(
            &urls::edit_status(&project.slug),
            Some(&cookie),
            &[("preparation_status", "open")],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), urls::show(&project.slug));

    let updated = db::get_project(&app.pool, &project.id).await.unwrap();
    assert_eq!(updated.status(), PreparationStatus::Open);
}

// ============================================================================
// Followers
// ============================================================================

#[tokio::test]
async fn test_add_follower_twice_keeps_one_edge() {
    let app = TestApp::new().await;
    let owner = create_test_user(&app.pool, "owner").await;
    let ada = create_test_user(&app.pool, "ada").await;
    let project = create_test_project(&app.pool, &owner, "Popular").await;
    let cookie = login(&app.pool, &owner).await;
    let add = format!("{}/add", urls::edit_followers(&project.slug));

    let first = app
        .send(post_form(&add, Some(&cookie), &[("username", "ada")]))
        .await;
    assert_eq!(first.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&first), urls::edit_followers(&project.slug));
    assert!(flash_messages(&first).is_empty());

    let second = app
        .send(post_form(&add, Some(&cookie), &[("username", "ada")]))
        .await;
    assert_eq!(second.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        flash_messages(&second),
        vec!["You are already following this course"]
    );

    let followers = db::list_followers(&app.pool, &project.id).await.unwrap();
    assert_eq!(followers.iter().filter(|u| u.id == ada.id).count(), 1);
    assert_eq!(followers.len(), 2);
}

#[tokio::test]
async fn test_add_unknown_follower_and_referer_redirect() {
    let app = TestApp::new().await;
    let owner = create_test_user(&app.pool, "owner").await;
    let project = create_test_project(&app.pool, &owner, "Popular").await;
    let cookie = login(&app.pool, &owner).await;

    let mut request = post_form(
        &format!("{}/add", urls::edit_followers(&project.slug)),
        Some(&cookie),
        &[("username", "ghost")],
    );
    request.headers_mut().insert(
        axum::http::header::REFERER,
        "https://learn.example.org/projects/popular".parse().unwrap(),
    );

    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/projects/popular");
    assert_eq!(flash_messages(&response), vec!["Username ghost does not exist"]);
    assert_eq!(db::count_followers(&app.pool, &project.id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_owner_cannot_be_removed_from_followers() {
    let app = TestApp::new().await;
    let owner = create_test_user(&app.pool, "owner").await;
    let project = create_test_project(&app.pool, &owner, "Mine").await;
    let cookie = login(&app.pool, &owner).await;

    let response = app
        .send(post_form(
            &format!("{}/delete", urls::edit_followers(&project.slug)),
            Some(&cookie),
            &[("follower_id", owner.id.as_str())],
        ))
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        flash_messages(&response),
        vec!["You cannot unfollow your own course"]
    );
    assert!(db::get_relationship(&app.pool, &owner.id, &project.id)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_remove_follower_messages() {
    let app = TestApp::new().await;
    let owner = create_test_user(&app.pool, "owner").await;
    let ada = create_test_user(&app.pool, "ada").await;
    let project = create_test_project(&app.pool, &owner, "Mine").await;
    db::create_relationship(&app.pool, &ada.id, &project.id)
        .await
        .unwrap();
    let cookie = login(&app.pool, &owner).await;
    let delete = format!("{}/delete", urls::edit_followers(&project.slug));

    let removed = app
        .send(post_form(&delete, Some(&cookie), &[("follower_id", ada.id.as_str())]))
        .await;
    assert_eq!(location(&removed), urls::edit_followers(&project.slug));
    assert_eq!(
        flash_messages(&removed),
        vec!["The follower ada Display has been removed."]
    );

    let again = app
        .send(post_form(&delete, Some(&cookie), &[("follower_id", ada.id.as_str())]))
        .await;
    assert_eq!(
        flash_messages(&again),
        vec!["The user is not following this course"]
    );

    let missing = app.send(post_form(&delete, Some(&cookie), &[])).await;
    assert_eq!(
        flash_messages(&missing),
        vec!["There was an error removing the user."]
    );

    assert_eq!(db::count_followers(&app.pool, &project.id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_followers_page_lists_followers() {
    let app = TestApp::new().await;
    let owner = create_test_user(&app.pool, "owner").await;
    let project = create_test_project(&app.pool, &owner, "Mine").await;
    let cookie = login(&app.pool, &owner).await;

    let response = app
        .send(get_request(&urls::edit_followers(&project.slug), Some(&cookie)))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response).await;
    assert_eq!(body["view"], "project_edit_followers");
    assert_eq!(body["followers"][0]["username"], "owner");
}

// ============================================================================
// Links
// ============================================================================

#[tokio::test]
async fn test_add_and_delete_link() {
    let app = TestApp::new().await;
    let owner = create_test_user(&app.pool, "owner").await;
    let project = create_test_project(&app.pool, &owner, "Linked").await;
    let cookie = login(&app.pool, &owner).await;

    let invalid = app
        .send(post_form(
            &urls::edit_links(&project.slug),
            Some(&cookie),
            &[("name", "Pad"), ("url", "not a url")],
        ))
        .await;
    assert_eq!(invalid.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = extract_json(invalid).await;
    assert_eq!(
        body["messages"][0]["message"],
        "There was an error adding your link."
    );

    let added = app
        .send(post_form(
            &urls::edit_links(&project.slug),
            Some(&cookie),
            &[("name", "Pad"), ("url", "https://pad.example.org/web")],
        ))
        .await;
    assert_eq!(added.status(), StatusCode::SEE_OTHER);
    assert_eq!(flash_messages(&added), vec!["Link added."]);

    let links = db::list_project_links(&app.pool, &project.id).await.unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].user_id, owner.id);

    let deleted = app
        .send(post_form(
            &urls::delete_link(&project.slug, &links[0].id),
            Some(&cookie),
            &[],
        ))
        .await;
    assert_eq!(deleted.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&deleted), urls::edit_links(&project.slug));
    assert_eq!(flash_messages(&deleted), vec!["The link was deleted"]);
    assert!(db::list_project_links(&app.pool, &project.id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_links_page_lists_links() {
    let app = TestApp::new().await;
    let owner = create_test_user(&app.pool, "owner").await;
    let project = create_test_project(&app.pool, &owner, "Linked").await;
    for (name, url) in [
        ("Pad", "https://pad.example.org/web"),
        ("Wiki", "https://wiki.example.org/web"),
    ] {
        db::create_link(
            &app.pool,
            db::CreateLink {
                id: db::new_id(),
                project_id: project.id.clone(),
                user_id: owner.id.clone(),
                name: name.into(),
                url: url.into(),
            },
        )
        .await
        .unwrap();
    }
    let cookie = login(&app.pool, &owner).await;

    let response = app
        .send(get_request(&urls::edit_links(&project.slug), Some(&cookie)))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response).await;
    assert_eq!(body["view"], "project_edit_links");
    assert_eq!(body["project"]["slug"], "linked");
    let mut names: Vec<_> = body["links"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["name"].as_str().unwrap().to_string())
        .collect();
    names.sort();
    assert_eq!(names, vec!["Pad", "Wiki"]);
    assert_eq!(body["form"]["name"], "");
}

#[tokio::test]
async fn test_deleting_link_of_another_project_is_forbidden() {
    let app = TestApp::new().await;
    let owner = create_test_user(&app.pool, "owner").await;
    let mine = create_test_project(&app.pool, &owner, "Mine").await;
    let other = create_test_project(&app.pool, &owner, "Other").await;
    let link = db::create_link(
        &app.pool,
        db::CreateLink {
            id: db::new_id(),
            project_id: other.id.clone(),
            user_id: owner.id.clone(),
            name: "Pad".into(),
            url: "https://pad.example.org".into(),
        },
    )
    .await
    .unwrap();
    let cookie = login(&app.pool, &owner).await;

    let response = app
        .send(post_form(
            &urls::delete_link(&mine.slug, &link.id),
            Some(&cookie),
            &[],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(db::get_link(&app.pool, &link.id).await.is_ok());

    let response = app
        .send(post_form(
            &urls::delete_link(&mine.slug, "no-such-link"),
            Some(&cookie),
            &[],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// Images
// ============================================================================

#[tokio::test]
async fn test_image_upload() {
    let app = TestApp::new().await;
    let owner = create_test_user(&app.pool, "owner").await;
    let project = create_test_project(&app.pool, &owner, "Pictured").await;
    let cookie = login(&app.pool, &owner).await;

    let response = app
        .send(post_image(
            &urls::edit_image(&project.slug),
            &cookie,
            "notes.txt",
            "text/plain",
            b"not an image",
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = extract_json(response).await;
    assert_eq!(
        body["messages"][0]["message"],
        "There was an error uploading your image"
    );

    let response = app
        .send(post_image(
            &urls::edit_image(&project.slug),
            &cookie,
            "logo.png",
            "image/png",
            PNG,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), urls::show(&project.slug));
    assert_eq!(flash_messages(&response), vec!["Image updated"]);

    let updated = db::get_project(&app.pool, &project.id).await.unwrap();
    let name = updated.image.expect("image is stored");
    assert!(name.ends_with(".png"));
    assert!(app.state.images.path_of(&name).exists());
}

#[tokio::test]
async fn test_oversized_image_rerenders_form() {
    let app = TestApp::new().await;
    let owner = create_test_user(&app.pool, "owner").await;
    let project = create_test_project(&app.pool, &owner, "Pictured").await;
    let cookie = login(&app.pool, &owner).await;
    let expected = format!("Image must be at most {} bytes.", TEST_MAX_IMAGE_SIZE);

    // Just over the image limit, and far past the request body limit
    for size in [TEST_MAX_IMAGE_SIZE + 1, 200 * 1024] {
        let mut data = PNG.to_vec();
        data.resize(size, 0);

        let response = app
            .send(post_image(
                &urls::edit_image(&project.slug),
                &cookie,
                "huge.png",
                "image/png",
                &data,
            ))
            .await;

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY, "{} bytes", size);
        let body = extract_json(response).await;
        assert_eq!(body["view"], "project_edit_image");
        assert_eq!(
            body["messages"][0]["message"],
            "There was an error uploading your image"
        );
        assert_eq!(body["errors"]["image"][0], expected.as_str());
    }

    let unchanged = db::get_project(&app.pool, &project.id).await.unwrap();
    assert!(unchanged.image.is_none());
}

#[tokio::test]
async fn test_image_upload_without_multipart_body() {
    let app = TestApp::new().await;
    let owner = create_test_user(&app.pool, "owner").await;
    let project = create_test_project(&app.pool, &owner, "Pictured").await;
    let cookie = login(&app.pool, &owner).await;

    let response = app
        .send(post_form(
            &urls::edit_image(&project.slug),
            Some(&cookie),
            &[("image", "logo.png")],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = extract_json(response).await;
    assert!(body["errors"]["image"].is_array());

    let response = app
        .send(post_form(
            &format!("{}/async", urls::edit_image(&project.slug)),
            Some(&cookie),
            &[("image", "logo.png")],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response).await;
    assert_eq!(body["error"], "There was an error uploading your image.");

    let unchanged = db::get_project(&app.pool, &project.id).await.unwrap();
    assert!(unchanged.image.is_none());
}

#[tokio::test]
async fn test_async_image_upload_always_answers_ok() {
    let app = TestApp::new().await;
    let owner = create_test_user(&app.pool, "owner").await;
    let project = create_test_project(&app.pool, &owner, "Pictured").await;
    let cookie = login(&app.pool, &owner).await;
    let uri = format!("{}/async", urls::edit_image(&project.slug));

    let response = app
        .send(post_image(&uri, &cookie, "notes.txt", "text/plain", b"nope"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response).await;
    assert_eq!(body["error"], "There was an error uploading your image.");

    let big = vec![0u8; TEST_MAX_IMAGE_SIZE + 1];
    let response = app
        .send(post_image(&uri, &cookie, "huge.png", "image/png", &big))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response).await;
    assert!(body["error"].is_string());

    let response = app
        .send(post_image(&uri, &cookie, "logo.gif", "image/gif", b"GIF89a...."))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response).await;
    let filename = body["filename"].as_str().unwrap();
    assert!(filename.ends_with(".gif"));
}

// ============================================================================
// Contact followers
// ============================================================================

#[tokio::test]
async fn test_contact_followers_skips_sender() {
    let app = TestApp::new().await;
    let owner = create_test_user(&app.pool, "owner").await;
    let ada = create_test_user(&app.pool, "ada").await;
    let bob = create_test_user(&app.pool, "bob").await;
    let project = create_test_project(&app.pool, &owner, "Chatty").await;
    for user in [&ada, &bob] {
        db::create_relationship(&app.pool, &user.id, &project.id)
            .await
            .unwrap();
    }
    let cookie = login(&app.pool, &owner).await;

    let invalid = app
        .send(post_form(
            &urls::contact(&project.slug),
            Some(&cookie),
            &[("subject", "Week 2")],
        ))
        .await;
    assert_eq!(invalid.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = app
        .send(post_form(
            &urls::contact(&project.slug),
            Some(&cookie),
            &[("subject", "Week 2"), ("message", "Reading list is up.")],
        ))
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), urls::show(&project.slug));
    assert_eq!(flash_messages(&response), vec!["Message successfully sent."]);

    assert_eq!(db::list_inbox(&app.pool, &ada.id).await.unwrap().len(), 1);
    assert_eq!(db::list_inbox(&app.pool, &bob.id).await.unwrap().len(), 1);
    assert!(db::list_inbox(&app.pool, &owner.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_contact_form_is_owner_only() {
    let app = TestApp::new().await;
    let owner = create_test_user(&app.pool, "owner").await;
    let mallory = create_test_user(&app.pool, "mallory").await;
    let project = create_test_project(&app.pool, &owner, "Chatty").await;

    let cookie = login(&app.pool, &mallory).await;
    let response = app
        .send(get_request(&urls::contact(&project.slug), Some(&cookie)))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let cookie = login(&app.pool, &owner).await;
    let response = app
        .send(get_request(&urls::contact(&project.slug), Some(&cookie)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response).await;
    assert_eq!(body["view"], "project_contact_followers");
}

/// Keeps what it is asked to send instead of delivering it.
#[derive(Default)]
struct RecordingMessenger {
    sent: Mutex<Vec<(String, Vec<String>)>>,
}

#[async_trait]
impl FollowerMessenger for RecordingMessenger {
    async fn send(&self, message: ContactMessage<'_>) -> drumbeat::Result<usize> {
        let usernames: Vec<String> = message
            .recipients
            .iter()
            .map(|u| u.username.clone())
            .collect();
        let count = usernames.len();
        self.sent
            .lock()
            .unwrap()
            .push((message.subject.to_string(), usernames));
        Ok(count)
    }
}

#[tokio::test]
async fn test_contact_followers_uses_configured_messenger() {
    let app = TestApp::new().await;
    let owner = create_test_user(&app.pool, "owner").await;
    let ada = create_test_user(&app.pool, "ada").await;
    let project = create_test_project(&app.pool, &owner, "Chatty").await;
    db::create_relationship(&app.pool, &ada.id, &project.id)
        .await
        .unwrap();
    let cookie = login(&app.pool, &owner).await;

    let messenger = Arc::new(RecordingMessenger::default());
    let router = build_router(app.state.clone().with_messenger(messenger.clone()));

    let response = router
        .oneshot(post_form(
            &urls::contact(&project.slug),
            Some(&cookie),
            &[("subject", "  Week 3  "), ("message", "Slides are up.")],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    // Nothing went through the default outbox
    assert_eq!(count(&app, "messages").await, 0);

    let sent = messenger.sent.lock().unwrap();
    assert_eq!(
        *sent,
        vec![("Week 3".to_string(), vec!["ada".to_string()])]
    );
}

// ============================================================================
// Sessions
// ============================================================================

#[tokio::test]
async fn test_expired_session_is_rejected() {
    let app = TestApp::new().await;
    let user = create_test_user(&app.pool, "ada").await;
    db::create_session(
        &app.pool,
        db::CreateSession {
            id: "stale".into(),
            user_id: user.id.clone(),
            expires_at: chrono::Utc::now() - chrono::Duration::hours(1),
        },
    )
    .await
    .unwrap();

    let response = app
        .send(get_request(&urls::create(), Some(&session_cookie("stale"))))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_huge_session_max_age_is_served() {
    let app = TestApp::new().await;
    let user = create_test_user(&app.pool, "ada").await;
    let cookie = login(&app.pool, &user).await;
    let router = build_router(app.state.clone().with_session_max_age(u64::MAX));

    let response = router
        .oneshot(get_request(&urls::create(), Some(&cookie)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_flash_is_shown_on_next_page() {
    let app = TestApp::new().await;
    let owner = create_test_user(&app.pool, "owner").await;
    let project = create_test_project(&app.pool, &owner, "Flashy").await;

    let flash = drumbeat::flash::encode(&[drumbeat::flash::FlashMessage::new(
        drumbeat::flash::Level::Success,
        "Image updated",
    )]);
    let request = axum::http::Request::builder()
        .uri(urls::show(&project.slug))
        .header(
            axum::http::header::COOKIE,
            format!("{}={}", drumbeat::flash::FLASH_COOKIE_NAME, flash),
        )
        .body(axum::body::Body::empty())
        .unwrap();

    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::OK);
    let cleared = response
        .headers()
        .get(axum::http::header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(cleared.starts_with(drumbeat::flash::FLASH_COOKIE_NAME));
    let body = extract_json(response).await;
    assert_eq!(body["messages"][0]["message"], "Image updated");
    assert_eq!(body["messages"][0]["level"], "success");
}
