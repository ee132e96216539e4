//! Menu API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;
use serde_json::Value;
use shared::models::{MenuItem, MenuPatch};

use crate::assets::AssetResolver;
use crate::core::CanteenState;
use crate::utils::{AppError, AppResult, ErrorCode};

/// 菜品 + 解析后的图片地址
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItemView {
    #[serde(flatten)]
    pub item: MenuItem,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl MenuItemView {
    fn new(item: MenuItem, assets: &AssetResolver) -> Self {
        let image_url = assets.resolve_image(&item.image_name);
        Self { item, image_url }
    }
}

/// GET /api/menu - 合并后的菜单
pub async fn list(State(state): State<CanteenState>) -> AppResult<Json<Vec<MenuItemView>>> {
    let items = state.catalog.get_merged_menu().await?;
    Ok(Json(
        items
            .into_iter()
            .map(|item| MenuItemView::new(item, &state.assets))
            .collect(),
    ))
}

/// GET /api/menu/:id - 单个菜品
pub async fn get_by_id(
    State(state): State<CanteenState>,
    Path(id): Path<String>,
) -> AppResult<Json<MenuItemView>> {
    let item = state.catalog.get_item(&id).await?.ok_or_else(|| {
        AppError::with_message(ErrorCode::ProductNotFound, format!("Menu item {} not found", id))
    })?;
    Ok(Json(MenuItemView::new(item, &state.assets)))
}

/// PATCH /api/admin/menu/:id - 更新菜品覆盖
///
/// 请求体宽松解析：无法识别或类型不对的字段直接忽略。
pub async fn update_override(
    State(state): State<CanteenState>,
    Path(id): Path<String>,
    Json(payload): Json<Value>,
) -> AppResult<Json<Option<MenuItemView>>> {
    let patch = MenuPatch::from_json(&payload);
    state.catalog.update_menu_override(&id, patch).await?;
    let item = state.catalog.get_item(&id).await?;
    Ok(Json(item.map(|item| MenuItemView::new(item, &state.assets))))
}

/// DELETE /api/admin/menu/:id/override - 恢复静态菜品
pub async fn reset_override(
    State(state): State<CanteenState>,
    Path(id): Path<String>,
) -> AppResult<Json<Option<MenuItemView>>> {
    state.catalog.reset_menu_override(&id).await?;
    let item = state.catalog.get_item(&id).await?;
    Ok(Json(item.map(|item| MenuItemView::new(item, &state.assets))))
}
