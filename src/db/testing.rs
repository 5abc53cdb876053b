//! Fixtures shared by the query module tests.

use super::{
    create_project, create_user, init_pool, initialize_schema, new_id, CreateProject, CreateUser,
    DbPool, Project, UserProfile,
};

pub async fn setup() -> DbPool {
    let pool = init_pool(":memory:").await.unwrap();
    initialize_schema(&pool).await.unwrap();
    pool
}

pub async fn seed_user(pool: &DbPool, username: &str) -> UserProfile {
    create_user(
        pool,
        CreateUser {
            id: new_id(),
            username: username.to_string(),
            display_name: format!("{} display", username),
            email: Some(format!("{}@example.org", username)),
        },
    )
    .await
    .unwrap()
}

pub async fn seed_project(pool: &DbPool, owner: &UserProfile, name: &str) -> Project {
    create_project(
        pool,
        CreateProject {
            id: new_id(),
            name: name.to_string(),
            short_description: format!("About {}", name),
            long_description: String::new(),
            created_by: owner.id.clone(),
        },
    )
    .await
    .unwrap()
}
