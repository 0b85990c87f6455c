//! Listing routes - JSON views of profiles, addresses and templates.

use axum::{Json, extract::State};
use std::collections::BTreeMap;
use std::sync::Arc;

use shipping_mark_core::{Profile, SelectableAddress};

use crate::helpers::{CoreResultExt, RouteResult};
use crate::state::AppState;

/// Profile table keyed by country key.
pub async fn profiles(State(state): State<Arc<AppState>>) -> Json<BTreeMap<String, Profile>> {
    Json(state.generator().profiles().profiles().clone())
}

/// Selectable address list.
pub async fn addresses(State(state): State<Arc<AppState>>) -> Json<Vec<SelectableAddress>> {
    Json(state.generator().profiles().addresses().to_vec())
}

/// Template PDFs available to batches, sorted.
pub async fn pdf_files(State(state): State<Arc<AppState>>) -> RouteResult<Json<Vec<String>>> {
    state.generator().templates().map(Json).or_api_error()
}
