use serde::Serialize;
use utoipa::ToSchema;

use crate::models::OrderView;

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<OrderView>,
}
