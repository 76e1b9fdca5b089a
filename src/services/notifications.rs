// src/services/notifications.rs

use chrono::Utc;
use log::info;

use super::ServiceResult;
use crate::auth::Caller;
use crate::error::ApiError;
use crate::models::Notification;
use crate::pagination::{self, Page, PageLinks, PageRequest};
use crate::routes::notifications::notifications_models::{
    CountResponse, MarkAllReadResponse, NotificationListQuery, NotificationView,
};
use crate::state::AppState;
use crate::validation;

const ORDERING_FIELDS: &[&str] = &["created_at", "read", "type"];

pub async fn list(
    state: &AppState,
    caller: &Caller,
    query: &NotificationListQuery,
    links: &PageLinks,
) -> ServiceResult<Page<NotificationView>> {
    let request = PageRequest::parse(query.page.as_deref(), query.page_size.as_deref())?;
    let read_filter = query.read.as_deref().map(validation::flag);
    let kind_filter = query.kind.as_deref().filter(|k| !k.is_empty());

    let mut notifications: Vec<Notification> = state
        .store
        .notifications_for_user(caller.id())
        .await?
        .into_iter()
        .filter(|n| read_filter.map_or(true, |read| n.read == read))
        .filter(|n| kind_filter.map_or(true, |kind| n.kind.as_str() == kind))
        .filter(|n| pagination::search_matches(query.search.as_deref(), &[n.message.as_str()]))
        .collect();

    let keys = pagination::ordering(query.ordering.as_deref(), ORDERING_FIELDS, "-created_at");
    pagination::sort_by_keys(&mut notifications, &keys, |a, b, field| match field {
        "read" => a.read.cmp(&b.read),
        "type" => a.kind.as_str().cmp(b.kind.as_str()),
        _ => a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)),
    });

    let now = Utc::now();
    let page = pagination::paginate(notifications, request, links)?;
    Ok(page.map(|n| NotificationView::new(n, now)))
}

/// Other users' notifications are reported as missing.
pub async fn get(state: &AppState, caller: &Caller, notification_id: i64) -> ServiceResult<NotificationView> {
    match state.store.notification_by_id(notification_id).await? {
        Some(n) if n.user_id == caller.id() => Ok(NotificationView::new(n, Utc::now())),
        _ => Err(ApiError::not_found()),
    }
}

pub async fn mark_read(state: &AppState, caller: &Caller, notification_id: i64) -> ServiceResult<NotificationView> {
    let notification = state
        .store
        .notification_by_id(notification_id)
        .await?
        .ok_or_else(ApiError::not_found)?;
    if notification.user_id != caller.id() {
        return Err(ApiError::forbidden("You can only mark your own notifications as read"));
    }

    let now = Utc::now();
    if !notification.read {
        state.store.mark_notification_read(notification.id, now).await?;
    }
    let notification = state
        .store
        .notification_by_id(notification_id)
        .await?
        .ok_or_else(ApiError::not_found)?;
    Ok(NotificationView::new(notification, now))
}

pub async fn mark_all_read(state: &AppState, caller: &Caller) -> ServiceResult<MarkAllReadResponse> {
    let marked_count = state.store.mark_all_notifications_read(caller.id(), Utc::now()).await?;
    info!("Marked {} notifications of user {} as read", marked_count, caller.id());
    Ok(MarkAllReadResponse {
        message: "All notifications marked as read".to_string(),
        marked_count,
    })
}

pub async fn counts(state: &AppState, caller: &Caller) -> ServiceResult<CountResponse> {
    let notifications = state.store.notifications_for_user(caller.id()).await?;
    Ok(CountResponse {
        unread_count: notifications.iter().filter(|n| !n.read).count(),
        total_count: notifications.len(),
    })
}
