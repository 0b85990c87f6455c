//! Page routes - full HTML page renders.

use axum::extract::State;
use std::sync::Arc;

use crate::helpers::{CoreResultExt, RouteResult};
use crate::state::AppState;
use crate::templates::{IndexTemplate, ProfileOption};

/// Landing page with the label form.
pub async fn index(State(state): State<Arc<AppState>>) -> RouteResult<IndexTemplate> {
    let generator = state.generator();
    Ok(IndexTemplate {
        profiles: ProfileOption::list(generator.profiles()),
        addresses: generator.profiles().addresses().to_vec(),
        templates: generator.templates().or_api_error()?,
    })
}
