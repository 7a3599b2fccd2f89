//! Back-office calls used by the regional-admin and super-admin consoles.
//!
//! List endpoints take an optional region code; the route layer decides
//! which region a caller is allowed to ask for.

use serde::Serialize;
use uuid::Uuid;

use super::api::ApiClient;
use crate::error::AppResult;
use crate::models::{
    AssignAdminRequest, Card, CardStatus, Commission, CommissionStatus, CreateRegionRequest, Order, OrderStatus,
    Promoter, Region, Role, UpdateCardStatusRequest, UpdateCommissionStatusRequest, UpdateOrderStatusRequest,
    UpdateRegionRequest, UpdateUserRoleRequest, UpdateUserStatusRequest, User, UserStatus,
};

#[derive(Serialize)]
struct RegionQuery<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    region: Option<&'a str>,
}

#[derive(Clone)]
pub struct AdminService {
    api: ApiClient,
}

impl AdminService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    async fn list<T: serde::de::DeserializeOwned>(&self, path: &str, token: &str, region: Option<&str>) -> AppResult<Vec<T>> {
        self.api.get_query(path, &RegionQuery { region }, Some(token)).await
    }

    // ------------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------------

    pub async fn users(&self, token: &str, region: Option<&str>) -> AppResult<Vec<User>> {
        self.list("/admin/users", token, region).await
    }

    pub async fn set_user_status(&self, token: &str, id: Uuid, status: UserStatus) -> AppResult<User> {
        let req = UpdateUserStatusRequest { status };
        self.api.patch(&format!("/admin/users/{}/status", id), &req, Some(token)).await
    }

    pub async fn set_user_role(&self, token: &str, id: Uuid, role: Role) -> AppResult<User> {
        let req = UpdateUserRoleRequest { role };
        self.api.patch(&format!("/admin/users/{}/role", id), &req, Some(token)).await
    }

    // ------------------------------------------------------------------------
    // Cards
    // ------------------------------------------------------------------------

    pub async fn cards(&self, token: &str, region: Option<&str>) -> AppResult<Vec<Card>> {
        self.list("/admin/cards", token, region).await
    }

    pub async fn set_card_status(&self, token: &str, id: Uuid, status: CardStatus) -> AppResult<Card> {
        let req = UpdateCardStatusRequest { status };
        self.api.patch(&format!("/admin/cards/{}/status", id), &req, Some(token)).await
    }

    // ------------------------------------------------------------------------
    // Orders
    // ------------------------------------------------------------------------

    pub async fn orders(&self, token: &str, region: Option<&str>) -> AppResult<Vec<Order>> {
        self.list("/admin/orders", token, region).await
    }

    pub async fn set_order_status(&self, token: &str, id: Uuid, status: OrderStatus) -> AppResult<Order> {
        let req = UpdateOrderStatusRequest { status };
        self.api.patch(&format!("/admin/orders/{}/status", id), &req, Some(token)).await
    }

    // ------------------------------------------------------------------------
    // Promoters and commissions
    // ------------------------------------------------------------------------

    pub async fn promoters(&self, token: &str, region: Option<&str>) -> AppResult<Vec<Promoter>> {
        self.list("/admin/promoters", token, region).await
    }

    pub async fn commissions(&self, token: &str, region: Option<&str>) -> AppResult<Vec<Commission>> {
        self.list("/admin/commissions", token, region).await
    }

    pub async fn set_commission_status(&self, token: &str, id: Uuid, status: CommissionStatus) -> AppResult<Commission> {
        let req = UpdateCommissionStatusRequest { status };
        self.api.patch(&format!("/admin/commissions/{}/status", id), &req, Some(token)).await
    }

    // ------------------------------------------------------------------------
    // Regions
    // ------------------------------------------------------------------------

    pub async fn regions(&self, token: &str) -> AppResult<Vec<Region>> {
        self.api.get("/regions", Some(token)).await
    }

    pub async fn create_region(&self, token: &str, req: &CreateRegionRequest) -> AppResult<Region> {
        self.api.post("/regions", req, Some(token)).await
    }

    pub async fn update_region(&self, token: &str, id: Uuid, req: &UpdateRegionRequest) -> AppResult<Region> {
        self.api.patch(&format!("/regions/{}", id), req, Some(token)).await
    }

    pub async fn assign_admin(&self, token: &str, id: Uuid, admin_id: Uuid) -> AppResult<Region> {
        let req = AssignAdminRequest { admin_id };
        self.api.put(&format!("/regions/{}/admin", id), &req, Some(token)).await
    }
}
