use actix_web::web;

use super::activity::activity_handlers;

pub fn activity_configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/api/activity").route("/", web::get().to(activity_handlers::recent_activity)));
}

use super::auth::auth_handlers;

pub fn auth_configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/auth")
            .route("/register/", web::post().to(auth_handlers::register))
            .route("/login/", web::post().to(auth_handlers::login))
            .route("/profile/", web::get().to(auth_handlers::get_profile))
            .route("/profile/", web::put().to(auth_handlers::update_profile))
            .route("/profile/", web::patch().to(auth_handlers::update_profile)),
    );
}

use super::token::token_handlers;

pub fn token_configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/token")
            .route("/", web::post().to(token_handlers::obtain_pair))
            .route("/refresh/", web::post().to(token_handlers::refresh))
            .route("/verify/", web::post().to(token_handlers::verify))
            .route("/blacklist/", web::post().to(token_handlers::blacklist)),
    );
}

use super::teams::teams_handlers;

pub fn teams_configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/teams")
            .route("/", web::get().to(teams_handlers::list_teams))
            .route("/", web::post().to(teams_handlers::create_team))
            .route("/{team_id}/", web::get().to(teams_handlers::get_team))
            .route("/{team_id}/", web::put().to(teams_handlers::put_team))
            .route("/{team_id}/", web::patch().to(teams_handlers::patch_team))
            .route("/{team_id}/", web::delete().to(teams_handlers::delete_team))
            .route("/{team_id}/members/", web::post().to(teams_handlers::add_member))
            .route("/{team_id}/members/{user_id}/", web::patch().to(teams_handlers::update_member))
            .route("/{team_id}/members/{user_id}/", web::delete().to(teams_handlers::remove_member)),
    );
}

use super::projects::projects_handlers;

pub fn projects_configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/projects")
            .route("/", web::get().to(projects_handlers::list_projects))
            .route("/", web::post().to(projects_handlers::create_project))
            .route("/{project_id}/", web::get().to(projects_handlers::get_project))
            .route("/{project_id}/", web::put().to(projects_handlers::put_project))
            .route("/{project_id}/", web::patch().to(projects_handlers::patch_project))
            .route("/{project_id}/", web::delete().to(projects_handlers::delete_project))
            .route("/{project_id}/stats/", web::get().to(projects_handlers::project_stats))
            .route("/{project_id}/members/", web::post().to(projects_handlers::add_member))
            .route("/{project_id}/members/{user_id}/", web::patch().to(projects_handlers::update_member))
            .route("/{project_id}/members/{user_id}/", web::delete().to(projects_handlers::remove_member)),
    );
}

use super::tasks::tasks_handlers;

pub fn tasks_configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/tasks")
            .route("/", web::get().to(tasks_handlers::list_tasks))
            .route("/", web::post().to(tasks_handlers::create_task))
            .route("/{task_id}/", web::get().to(tasks_handlers::get_task))
            .route("/{task_id}/", web::put().to(tasks_handlers::put_task))
            .route("/{task_id}/", web::patch().to(tasks_handlers::patch_task))
            .route("/{task_id}/", web::delete().to(tasks_handlers::delete_task))
            .route("/{task_id}/assign/", web::post().to(tasks_handlers::assign_task))
            .route("/{task_id}/status/", web::patch().to(tasks_handlers::change_status))
            .route("/{task_id}/comments/", web::get().to(tasks_handlers::list_comments))
            .route("/{task_id}/comments/", web::post().to(tasks_handlers::create_comment))
            .route("/{task_id}/comments/{comment_id}/", web::get().to(tasks_handlers::get_comment))
            .route("/{task_id}/comments/{comment_id}/", web::put().to(tasks_handlers::put_comment))
            .route("/{task_id}/comments/{comment_id}/", web::patch().to(tasks_handlers::patch_comment))
            .route("/{task_id}/comments/{comment_id}/", web::delete().to(tasks_handlers::delete_comment)),
    );
}

use super::notifications::notifications_handlers;

pub fn notifications_configure(cfg: &mut web::ServiceConfig) {
    // static segments first so they are not taken for an id
    cfg.service(
        web::scope("/api/notifications")
            .route("/", web::get().to(notifications_handlers::list_notifications))
            .route("/mark-all-read/", web::post().to(notifications_handlers::mark_all_read))
            .route("/count/", web::get().to(notifications_handlers::counts))
            .route("/{notification_id}/", web::get().to(notifications_handlers::get_notification))
            .route("/{notification_id}/mark-read/", web::patch().to(notifications_handlers::mark_read)),
    );
}

use super::health::health_handlers;

pub fn health_configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/health")
            .route("/", web::get().to(health_handlers::health))
            .route("/db/", web::get().to(health_handlers::database_health)),
    );
}
