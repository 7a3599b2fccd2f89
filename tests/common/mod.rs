//! Shared harness for the integration tests.
//!
//! Spins up two in-process servers on ephemeral ports: a stub of the
//! upstream REST API backed by seeded in-memory data, and the gateway itself
//! pointed at that stub with a memory draft store.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, patch, post, put};
use axum::{Json, Router};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use reviewcard_storefront::checkout::MemoryCheckoutStore;
use reviewcard_storefront::config::Settings;
use reviewcard_storefront::models::{
    ActivateCardRequest, AssignAdminRequest, AuthSession, CapturePaymentRequest, Card, CardOwner, CardStatus,
    Commission, CommissionStatus, CreateOrderRequest, CreatePromoCodeRequest, CreateRegionRequest, Discount,
    LoginRequest, Order, OrderCustomer, OrderPackage, OrderStatus, Payment, PaymentMethod, PaymentStatus, Plan,
    PromoCode, Promoter, Quote, QuoteRequest, Region, RegisterRequest, Role, ShippingAddress, ShippingMethod,
    UpdateCardRequest, UpdateCardStatusRequest, UpdateCommissionStatusRequest, UpdateOrderStatusRequest,
    UpdatePromoCodeRequest, UpdateRegionRequest, UpdateUserRoleRequest, UpdateUserStatusRequest, User, UserStatus,
};
use reviewcard_storefront::state::AppState;

pub const CUSTOMER: &str = "tok-customer";
pub const CUSTOMER_PA: &str = "tok-customer-pa";
pub const PROMOTER: &str = "tok-promoter";
pub const ADMIN_CR: &str = "tok-admin-cr";
pub const ROOT: &str = "tok-root";
pub const SUSPENDED: &str = "tok-suspended";

pub const CUSTOMER_EMAIL: &str = "ana@example.com";
pub const CUSTOMER_PASSWORD: &str = "secret123";

/// Paypal order id the stub refuses to capture.
pub const DECLINED_PAYPAL_ID: &str = "PAYPAL-DECLINED";

/// Paypal order id the stub answers with 200 but a failed payment.
pub const FAILED_CAPTURE_PAYPAL_ID: &str = "PAYPAL-INSUFFICIENT-FUNDS";

/// Ids of the seeded records tests refer to.
#[derive(Debug, Clone)]
pub struct Fixture {
    pub customer: Uuid,
    pub customer_pa: Uuid,
    pub promoter: Uuid,
    pub admin_cr: Uuid,
    pub root: Uuid,
    pub suspended: Uuid,
    pub pending_card: Uuid,
    pub active_card: Uuid,
    pub card_pa: Uuid,
    pub order_cr: Uuid,
    pub order_pa: Uuid,
    pub delivered_order: Uuid,
    pub commission_pending: Uuid,
    pub region_cr: Uuid,
}

#[derive(Default)]
pub struct Upstream {
    pub users: Vec<User>,
    pub passwords: HashMap<String, String>,
    pub tokens: HashMap<String, Uuid>,
    pub plans: Vec<Plan>,
    pub cards: Vec<Card>,
    pub orders: Vec<Order>,
    pub codes: Vec<PromoCode>,
    pub commissions: Vec<Commission>,
    pub promoters: Vec<Promoter>,
    pub regions: Vec<Region>,
    pub captures: usize,
}

pub type SharedUpstream = Arc<Mutex<Upstream>>;

type Failure = (StatusCode, Json<Value>);
type Reply<T> = Result<Json<T>, Failure>;

fn fail(status: StatusCode, message: &str) -> Failure {
    (status, Json(json!({ "message": message })))
}

fn not_found(what: &str) -> Failure {
    fail(StatusCode::NOT_FOUND, &format!("{} not found", what))
}

// ============================================================================
// Seed data
// ============================================================================

fn days_ago(days: i64) -> DateTime<Utc> {
    Utc::now() - ChronoDuration::days(days)
}

pub fn address(country: &str) -> ShippingAddress {
    ShippingAddress {
        full_name: "Ana Lopez".to_string(),
        line1: "Av. Central 120".to_string(),
        line2: None,
        city: "San Jose".to_string(),
        state: None,
        postal_code: "10101".to_string(),
        country: country.to_string(),
        phone: "+506 8888 1234".to_string(),
    }
}

fn user(name: &str, email: &str, role: Role, region: Option<&str>, status: UserStatus) -> User {
    User {
        id: Uuid::new_v4(),
        name: name.to_string(),
        email: email.to_string(),
        role,
        region: region.map(str::to_string),
        status,
        created_at: days_ago(30),
    }
}

fn card(owner: &User, uid: &str, status: CardStatus, business: &str, scans: u64, reviews: u64) -> Card {
    Card {
        id: Uuid::new_v4(),
        uid: uid.to_string(),
        status,
        business_name: business.to_string(),
        google_review_link: None,
        owner: Some(CardOwner {
            id: owner.id,
            name: owner.name.clone(),
        }),
        scan_count: scans,
        review_count: reviews,
        region: owner.region.clone(),
        created_at: days_ago(25),
    }
}

fn order(customer: &User, number: &str, status: OrderStatus, total: f64, created_at: DateTime<Utc>) -> Order {
    Order {
        id: Uuid::new_v4(),
        order_number: number.to_string(),
        status,
        package: OrderPackage {
            plan_id: "starter".to_string(),
            plan_name: "Starter".to_string(),
            quantity: 1,
        },
        payment: Some(Payment {
            method: PaymentMethod::BankTransfer,
            status: if status == OrderStatus::Pending {
                PaymentStatus::Pending
            } else {
                PaymentStatus::Captured
            },
            amount: total,
            currency: "USD".to_string(),
            reference: None,
        }),
        shipping_address: address("CR"),
        items: Vec::new(),
        promo_code: None,
        total,
        currency: "USD".to_string(),
        region: customer.region.clone(),
        customer: Some(OrderCustomer {
            id: Some(customer.id),
            name: customer.name.clone(),
            email: customer.email.clone(),
        }),
        created_at,
    }
}

fn commission(order: &Order, promoter_id: Uuid, amount: f64, status: CommissionStatus) -> Commission {
    Commission {
        id: Uuid::new_v4(),
        order_id: order.id,
        order_number: Some(order.order_number.clone()),
        promoter_id,
        amount,
        status,
        region: order.region.clone(),
        created_at: order.created_at,
    }
}

fn promo(code: &str, discount: Discount, promoter_id: Uuid) -> PromoCode {
    PromoCode {
        code: code.to_string(),
        discount,
        usage: 0,
        max_usage: None,
        valid_from: None,
        valid_until: None,
        active: true,
        promoter_id: Some(promoter_id),
    }
}

pub fn seed() -> (Upstream, Fixture) {
    let customer = user("Ana Lopez", CUSTOMER_EMAIL, Role::User, Some("CR"), UserStatus::Active);
    let customer_pa = user("Luis Vega", "luis@example.com", Role::User, Some("PA"), UserStatus::Active);
    let promoter = user("Pablo Mora", "pablo@example.com", Role::Promoter, Some("CR"), UserStatus::Active);
    let admin_cr = user("Carla Ruiz", "carla@example.com", Role::RegionalAdmin, Some("CR"), UserStatus::Active);
    let root = user("Root", "root@example.com", Role::SuperAdmin, None, UserStatus::Active);
    let suspended = user("Sam Soto", "sam@example.com", Role::User, Some("CR"), UserStatus::Suspended);

    let pending_card = card(&customer, "", CardStatus::Pending, "Cafe Ana", 0, 0);
    let mut active_card = card(&customer, "04A1B2C3", CardStatus::Active, "Ana Bakery", 10, 3);
    active_card.google_review_link = Some("https://g.page/ana-bakery/review".to_string());
    let card_pa = card(&customer_pa, "04FFEE01", CardStatus::Active, "Luis Tacos", 4, 1);

    let order_cr = order(&customer, "RC-00001", OrderStatus::Pending, 34.0, days_ago(3));
    let order_pa = order(&customer_pa, "RC-00002", OrderStatus::Paid, 104.0, days_ago(20));
    let delivered_order = order(&customer, "RC-00003", OrderStatus::Delivered, 104.0, days_ago(40));

    let other_promoter = Uuid::new_v4();
    let commission_pending = commission(&order_cr, promoter.id, 3.4, CommissionStatus::Pending);
    let commission_paid = commission(&delivered_order, promoter.id, 10.4, CommissionStatus::Paid);
    let commission_pa = commission(&order_pa, other_promoter, 10.4, CommissionStatus::Pending);

    let mut welcome = promo("WELCOME10", Discount::Percentage(10.0), promoter.id);
    welcome.usage = 3;
    let mut expired = promo("EXPIRED5", Discount::Fixed(5.0), promoter.id);
    expired.valid_until = Some(days_ago(1));

    let region_cr = Region {
        id: Uuid::new_v4(),
        name: "Costa Rica".to_string(),
        code: "CR".to_string(),
        active: true,
        admin_id: Some(admin_cr.id),
        admin_name: Some(admin_cr.name.clone()),
    };
    let region_pa = Region {
        id: Uuid::new_v4(),
        name: "Panama".to_string(),
        code: "PA".to_string(),
        active: true,
        admin_id: None,
        admin_name: None,
    };

    let fixture = Fixture {
        customer: customer.id,
        customer_pa: customer_pa.id,
        promoter: promoter.id,
        admin_cr: admin_cr.id,
        root: root.id,
        suspended: suspended.id,
        pending_card: pending_card.id,
        active_card: active_card.id,
        card_pa: card_pa.id,
        order_cr: order_cr.id,
        order_pa: order_pa.id,
        delivered_order: delivered_order.id,
        commission_pending: commission_pending.id,
        region_cr: region_cr.id,
    };

    let tokens = [
        (CUSTOMER, customer.id),
        (CUSTOMER_PA, customer_pa.id),
        (PROMOTER, promoter.id),
        (ADMIN_CR, admin_cr.id),
        (ROOT, root.id),
        (SUSPENDED, suspended.id),
    ]
    .into_iter()
    .map(|(token, id)| (token.to_string(), id))
    .collect();

    let promoters = vec![
        Promoter {
            id: promoter.id,
            name: promoter.name.clone(),
            email: promoter.email.clone(),
            region: Some("CR".to_string()),
            status: UserStatus::Active,
            commission_rate: 0.1,
            code_count: 2,
            total_sales: 138.0,
            total_commission: 13.8,
        },
        Promoter {
            id: other_promoter,
            name: "Pia Diaz".to_string(),
            email: "pia@example.com".to_string(),
            region: Some("PA".to_string()),
            status: UserStatus::Active,
            commission_rate: 0.1,
            code_count: 0,
            total_sales: 104.0,
            total_commission: 10.4,
        },
    ];

    let plans = vec![
        Plan {
            id: "starter".to_string(),
            name: "Starter".to_string(),
            card_count: 1,
            price: 29.0,
            currency: "USD".to_string(),
            description: Some("One review card".to_string()),
            featured: false,
        },
        Plan {
            id: "business".to_string(),
            name: "Business".to_string(),
            card_count: 5,
            price: 99.0,
            currency: "USD".to_string(),
            description: None,
            featured: true,
        },
    ];

    let mut passwords = HashMap::new();
    passwords.insert(CUSTOMER_EMAIL.to_string(), CUSTOMER_PASSWORD.to_string());

    let upstream = Upstream {
        users: vec![customer, customer_pa, promoter, admin_cr, root, suspended],
        passwords,
        tokens,
        plans,
        cards: vec![pending_card, active_card, card_pa],
        orders: vec![order_cr, order_pa, delivered_order],
        codes: vec![welcome, expired],
        commissions: vec![commission_pending, commission_paid, commission_pa],
        promoters,
        regions: vec![region_cr, region_pa],
        captures: 0,
    };
    (upstream, fixture)
}

// ============================================================================
// Stub upstream API
// ============================================================================

fn caller(data: &Upstream, headers: &HeaderMap) -> Result<User, Failure> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .and_then(|token| data.tokens.get(token))
        .and_then(|id| data.users.iter().find(|u| u.id == *id))
        .cloned()
        .ok_or_else(|| fail(StatusCode::UNAUTHORIZED, "Invalid or expired token"))
}

fn price(data: &Upstream, req: &QuoteRequest) -> Result<Quote, Failure> {
    let plan = data
        .plans
        .iter()
        .find(|p| p.id == req.plan_id)
        .ok_or_else(|| fail(StatusCode::BAD_REQUEST, "Unknown plan"))?;
    let subtotal = plan.price * req.quantity as f64;
    let discount = req
        .promo_code
        .as_deref()
        .and_then(|code| data.codes.iter().find(|c| c.code == code))
        .map(|c| c.discount_on(subtotal))
        .unwrap_or(0.0);
    let shipping = match req.shipping_method {
        ShippingMethod::Standard => 5.0,
        ShippingMethod::Express => 15.0,
    };
    Ok(Quote {
        subtotal,
        discount,
        shipping,
        tax: 0.0,
        total: subtotal - discount + shipping,
        currency: plan.currency.clone(),
    })
}

#[derive(Deserialize)]
struct RegionQuery {
    region: Option<String>,
}

fn in_region(region: &Option<String>, query: &RegionQuery) -> bool {
    match &query.region {
        Some(wanted) => region.as_deref() == Some(wanted.as_str()),
        None => true,
    }
}

async fn login(State(up): State<SharedUpstream>, Json(req): Json<LoginRequest>) -> Reply<AuthSession> {
    let data = up.lock().unwrap();
    if data.passwords.get(&req.email) != Some(&req.password) {
        return Err(fail(StatusCode::UNAUTHORIZED, "Invalid credentials"));
    }
    let user = data
        .users
        .iter()
        .find(|u| u.email == req.email)
        .cloned()
        .ok_or_else(|| not_found("user"))?;
    let token = data
        .tokens
        .iter()
        .find(|(_, id)| **id == user.id)
        .map(|(token, _)| token.clone())
        .ok_or_else(|| fail(StatusCode::UNAUTHORIZED, "No session"))?;
    Ok(Json(AuthSession { token, user }))
}

async fn register(
    State(up): State<SharedUpstream>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthSession>), Failure> {
    let mut data = up.lock().unwrap();
    if data.users.iter().any(|u| u.email == req.email) {
        return Err(fail(StatusCode::BAD_REQUEST, "Email already registered"));
    }
    let user = User {
        id: Uuid::new_v4(),
        name: req.name,
        email: req.email.clone(),
        role: Role::User,
        region: req.region,
        status: UserStatus::Active,
        created_at: Utc::now(),
    };
    let token = format!("tok-{}", user.id);
    data.passwords.insert(req.email, req.password);
    data.tokens.insert(token.clone(), user.id);
    data.users.push(user.clone());
    Ok((StatusCode::CREATED, Json(AuthSession { token, user })))
}

async fn me(State(up): State<SharedUpstream>, headers: HeaderMap) -> Reply<User> {
    let data = up.lock().unwrap();
    caller(&data, &headers).map(Json)
}

async fn logout(State(up): State<SharedUpstream>, headers: HeaderMap) -> Result<StatusCode, Failure> {
    let data = up.lock().unwrap();
    caller(&data, &headers)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn plans(State(up): State<SharedUpstream>) -> Json<Vec<Plan>> {
    Json(up.lock().unwrap().plans.clone())
}

async fn promo_code(State(up): State<SharedUpstream>, Path(code): Path<String>) -> Reply<PromoCode> {
    let data = up.lock().unwrap();
    data.codes
        .iter()
        .find(|c| c.code == code)
        .cloned()
        .map(Json)
        .ok_or_else(|| not_found("promo code"))
}

async fn quote(State(up): State<SharedUpstream>, Json(req): Json<QuoteRequest>) -> Reply<Quote> {
    let data = up.lock().unwrap();
    price(&data, &req).map(Json)
}

async fn create_order(
    State(up): State<SharedUpstream>,
    headers: HeaderMap,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>), Failure> {
    let mut data = up.lock().unwrap();
    let customer = caller(&data, &headers).ok();
    let quote = price(
        &data,
        &QuoteRequest {
            plan_id: req.plan_id.clone(),
            quantity: req.quantity,
            promo_code: req.promo_code.clone(),
            shipping_method: req.shipping_method,
            country: req.shipping_address.country.clone(),
        },
    )?;
    let plan_name = data
        .plans
        .iter()
        .find(|p| p.id == req.plan_id)
        .map(|p| p.name.clone())
        .unwrap_or_default();

    let order = Order {
        id: Uuid::new_v4(),
        order_number: format!("RC-{:05}", data.orders.len() + 1),
        status: OrderStatus::Pending,
        package: OrderPackage {
            plan_id: req.plan_id,
            plan_name,
            quantity: req.quantity,
        },
        payment: Some(Payment {
            method: req.payment_method,
            status: PaymentStatus::Pending,
            amount: quote.total,
            currency: quote.currency.clone(),
            reference: None,
        }),
        shipping_address: req.shipping_address,
        items: Vec::new(),
        promo_code: req.promo_code,
        total: quote.total,
        currency: quote.currency,
        region: customer
            .as_ref()
            .and_then(|c| c.region.clone())
            .or_else(|| Some("CR".to_string())),
        customer: customer.map(|c| OrderCustomer {
            id: Some(c.id),
            name: c.name,
            email: c.email,
        }),
        created_at: Utc::now(),
    };
    data.orders.push(order.clone());
    Ok((StatusCode::CREATED, Json(order)))
}

async fn capture(State(up): State<SharedUpstream>, Json(req): Json<CapturePaymentRequest>) -> Reply<Order> {
    let mut data = up.lock().unwrap();
    if req.paypal_order_id == DECLINED_PAYPAL_ID {
        return Err(fail(StatusCode::BAD_GATEWAY, "PayPal declined the payment"));
    }
    let order = data
        .orders
        .iter_mut()
        .find(|o| o.id == req.order_id)
        .ok_or_else(|| not_found("order"))?;
    if req.paypal_order_id == FAILED_CAPTURE_PAYPAL_ID {
        if let Some(payment) = order.payment.as_mut() {
            payment.status = PaymentStatus::Failed;
        }
        return Ok(Json(order.clone()));
    }
    order.status = OrderStatus::Paid;
    if let Some(payment) = order.payment.as_mut() {
        payment.status = PaymentStatus::Captured;
        payment.reference = Some(req.paypal_order_id.clone());
    }
    let order = order.clone();
    data.captures += 1;
    Ok(Json(order))
}

async fn my_orders(State(up): State<SharedUpstream>, headers: HeaderMap) -> Reply<Vec<Order>> {
    let data = up.lock().unwrap();
    let user = caller(&data, &headers)?;
    Ok(Json(
        data.orders
            .iter()
            .filter(|o| o.customer.as_ref().and_then(|c| c.id) == Some(user.id))
            .cloned()
            .collect(),
    ))
}

async fn get_order(State(up): State<SharedUpstream>, headers: HeaderMap, Path(id): Path<Uuid>) -> Reply<Order> {
    let data = up.lock().unwrap();
    let user = caller(&data, &headers)?;
    data.orders
        .iter()
        .find(|o| o.id == id && o.customer.as_ref().and_then(|c| c.id) == Some(user.id))
        .cloned()
        .map(Json)
        .ok_or_else(|| not_found("order"))
}

async fn my_cards(State(up): State<SharedUpstream>, headers: HeaderMap) -> Reply<Vec<Card>> {
    let data = up.lock().unwrap();
    let user = caller(&data, &headers)?;
    Ok(Json(
        data.cards
            .iter()
            .filter(|c| c.owner.as_ref().map(|o| o.id) == Some(user.id))
            .cloned()
            .collect(),
    ))
}

fn owned_card<'a>(data: &'a mut Upstream, owner: Uuid, id: Uuid) -> Result<&'a mut Card, Failure> {
    data.cards
        .iter_mut()
        .find(|c| c.id == id && c.owner.as_ref().map(|o| o.id) == Some(owner))
        .ok_or_else(|| not_found("card"))
}

async fn update_card(
    State(up): State<SharedUpstream>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateCardRequest>,
) -> Reply<Card> {
    let mut data = up.lock().unwrap();
    let user = caller(&data, &headers)?;
    let card = owned_card(&mut data, user.id, id)?;
    if let Some(name) = req.business_name {
        card.business_name = name;
    }
    if let Some(link) = req.google_review_link {
        card.google_review_link = Some(link);
    }
    Ok(Json(card.clone()))
}

async fn activate_card(
    State(up): State<SharedUpstream>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<ActivateCardRequest>,
) -> Reply<Card> {
    let mut data = up.lock().unwrap();
    let user = caller(&data, &headers)?;
    let card = owned_card(&mut data, user.id, id)?;
    card.uid = req.uid;
    card.status = CardStatus::Active;
    Ok(Json(card.clone()))
}

async fn admin_users(
    State(up): State<SharedUpstream>,
    headers: HeaderMap,
    Query(q): Query<RegionQuery>,
) -> Reply<Vec<User>> {
    let data = up.lock().unwrap();
    caller(&data, &headers)?;
    Ok(Json(data.users.iter().filter(|u| in_region(&u.region, &q)).cloned().collect()))
}

async fn admin_cards(
    State(up): State<SharedUpstream>,
    headers: HeaderMap,
    Query(q): Query<RegionQuery>,
) -> Reply<Vec<Card>> {
    let data = up.lock().unwrap();
    caller(&data, &headers)?;
    Ok(Json(data.cards.iter().filter(|c| in_region(&c.region, &q)).cloned().collect()))
}

async fn admin_orders(
    State(up): State<SharedUpstream>,
    headers: HeaderMap,
    Query(q): Query<RegionQuery>,
) -> Reply<Vec<Order>> {
    let data = up.lock().unwrap();
    caller(&data, &headers)?;
    Ok(Json(data.orders.iter().filter(|o| in_region(&o.region, &q)).cloned().collect()))
}

async fn admin_promoters(
    State(up): State<SharedUpstream>,
    headers: HeaderMap,
    Query(q): Query<RegionQuery>,
) -> Reply<Vec<Promoter>> {
    let data = up.lock().unwrap();
    caller(&data, &headers)?;
    Ok(Json(data.promoters.iter().filter(|p| in_region(&p.region, &q)).cloned().collect()))
}

async fn admin_commissions(
    State(up): State<SharedUpstream>,
    headers: HeaderMap,
    Query(q): Query<RegionQuery>,
) -> Reply<Vec<Commission>> {
    let data = up.lock().unwrap();
    caller(&data, &headers)?;
    Ok(Json(data.commissions.iter().filter(|c| in_region(&c.region, &q)).cloned().collect()))
}

async fn set_user_status(
    State(up): State<SharedUpstream>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUserStatusRequest>,
) -> Reply<User> {
    let mut data = up.lock().unwrap();
    caller(&data, &headers)?;
    let user = data.users.iter_mut().find(|u| u.id == id).ok_or_else(|| not_found("user"))?;
    user.status = req.status;
    Ok(Json(user.clone()))
}

async fn set_user_role(
    State(up): State<SharedUpstream>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUserRoleRequest>,
) -> Reply<User> {
    let mut data = up.lock().unwrap();
    caller(&data, &headers)?;
    let user = data.users.iter_mut().find(|u| u.id == id).ok_or_else(|| not_found("user"))?;
    user.role = req.role;
    Ok(Json(user.clone()))
}

async fn set_card_status(
    State(up): State<SharedUpstream>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateCardStatusRequest>,
) -> Reply<Card> {
    let mut data = up.lock().unwrap();
    caller(&data, &headers)?;
    let card = data.cards.iter_mut().find(|c| c.id == id).ok_or_else(|| not_found("card"))?;
    card.status = req.status;
    Ok(Json(card.clone()))
}

async fn set_order_status(
    State(up): State<SharedUpstream>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateOrderStatusRequest>,
) -> Reply<Order> {
    let mut data = up.lock().unwrap();
    caller(&data, &headers)?;
    let order = data.orders.iter_mut().find(|o| o.id == id).ok_or_else(|| not_found("order"))?;
    order.status = req.status;
    Ok(Json(order.clone()))
}

async fn set_commission_status(
    State(up): State<SharedUpstream>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateCommissionStatusRequest>,
) -> Reply<Commission> {
    let mut data = up.lock().unwrap();
    caller(&data, &headers)?;
    let commission = data
        .commissions
        .iter_mut()
        .find(|c| c.id == id)
        .ok_or_else(|| not_found("commission"))?;
    commission.status = req.status;
    Ok(Json(commission.clone()))
}

async fn regions(State(up): State<SharedUpstream>, headers: HeaderMap) -> Reply<Vec<Region>> {
    let data = up.lock().unwrap();
    caller(&data, &headers)?;
    Ok(Json(data.regions.clone()))
}

async fn create_region(
    State(up): State<SharedUpstream>,
    headers: HeaderMap,
    Json(req): Json<CreateRegionRequest>,
) -> Result<(StatusCode, Json<Region>), Failure> {
    let mut data = up.lock().unwrap();
    caller(&data, &headers)?;
    if data.regions.iter().any(|r| r.code == req.code) {
        return Err(fail(StatusCode::BAD_REQUEST, "Region code already in use"));
    }
    let region = Region {
        id: Uuid::new_v4(),
        name: req.name,
        code: req.code,
        active: true,
        admin_id: None,
        admin_name: None,
    };
    data.regions.push(region.clone());
    Ok((StatusCode::CREATED, Json(region)))
}

async fn update_region(
    State(up): State<SharedUpstream>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateRegionRequest>,
) -> Reply<Region> {
    let mut data = up.lock().unwrap();
    caller(&data, &headers)?;
    let region = data.regions.iter_mut().find(|r| r.id == id).ok_or_else(|| not_found("region"))?;
    if let Some(name) = req.name {
        region.name = name;
    }
    if let Some(active) = req.active {
        region.active = active;
    }
    Ok(Json(region.clone()))
}

async fn assign_admin(
    State(up): State<SharedUpstream>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<AssignAdminRequest>,
) -> Reply<Region> {
    let mut data = up.lock().unwrap();
    caller(&data, &headers)?;
    let admin_name = data
        .users
        .iter()
        .find(|u| u.id == req.admin_id)
        .map(|u| u.name.clone())
        .ok_or_else(|| not_found("user"))?;
    let region = data.regions.iter_mut().find(|r| r.id == id).ok_or_else(|| not_found("region"))?;
    region.admin_id = Some(req.admin_id);
    region.admin_name = Some(admin_name);
    Ok(Json(region.clone()))
}

async fn promoter_codes(State(up): State<SharedUpstream>, headers: HeaderMap) -> Reply<Vec<PromoCode>> {
    let data = up.lock().unwrap();
    let user = caller(&data, &headers)?;
    Ok(Json(
        data.codes
            .iter()
            .filter(|c| c.promoter_id == Some(user.id))
            .cloned()
            .collect(),
    ))
}

async fn create_code(
    State(up): State<SharedUpstream>,
    headers: HeaderMap,
    Json(req): Json<CreatePromoCodeRequest>,
) -> Result<(StatusCode, Json<PromoCode>), Failure> {
    let mut data = up.lock().unwrap();
    let user = caller(&data, &headers)?;
    if data.codes.iter().any(|c| c.code == req.code) {
        return Err(fail(StatusCode::BAD_REQUEST, "Code already exists"));
    }
    let code = PromoCode {
        code: req.code,
        discount: req.discount,
        usage: 0,
        max_usage: req.max_usage,
        valid_from: req.valid_from,
        valid_until: req.valid_until,
        active: true,
        promoter_id: Some(user.id),
    };
    data.codes.push(code.clone());
    Ok((StatusCode::CREATED, Json(code)))
}

async fn set_code_active(
    State(up): State<SharedUpstream>,
    headers: HeaderMap,
    Path(code): Path<String>,
    Json(req): Json<UpdatePromoCodeRequest>,
) -> Reply<PromoCode> {
    let mut data = up.lock().unwrap();
    let user = caller(&data, &headers)?;
    let code = data
        .codes
        .iter_mut()
        .find(|c| c.code == code && c.promoter_id == Some(user.id))
        .ok_or_else(|| not_found("promo code"))?;
    code.active = req.active;
    Ok(Json(code.clone()))
}

async fn promoter_commissions(State(up): State<SharedUpstream>, headers: HeaderMap) -> Reply<Vec<Commission>> {
    let data = up.lock().unwrap();
    let user = caller(&data, &headers)?;
    Ok(Json(
        data.commissions
            .iter()
            .filter(|c| c.promoter_id == user.id)
            .cloned()
            .collect(),
    ))
}

fn stub_router(upstream: SharedUpstream) -> Router {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/me", get(me))
        .route("/auth/logout", post(logout))
        .route("/plans", get(plans))
        .route("/promo-codes/{code}", get(promo_code))
        .route("/orders", post(create_order))
        .route("/orders/quote", post(quote))
        .route("/orders/mine", get(my_orders))
        .route("/orders/{id}", get(get_order))
        .route("/payments/paypal/capture", post(capture))
        .route("/cards/mine", get(my_cards))
        .route("/cards/{id}", patch(update_card))
        .route("/cards/{id}/activate", post(activate_card))
        .route("/admin/users", get(admin_users))
        .route("/admin/users/{id}/status", patch(set_user_status))
        .route("/admin/users/{id}/role", patch(set_user_role))
        .route("/admin/cards", get(admin_cards))
        .route("/admin/cards/{id}/status", patch(set_card_status))
        .route("/admin/orders", get(admin_orders))
        .route("/admin/orders/{id}/status", patch(set_order_status))
        .route("/admin/promoters", get(admin_promoters))
        .route("/admin/commissions", get(admin_commissions))
        .route("/admin/commissions/{id}/status", patch(set_commission_status))
        .route("/regions", get(regions).post(create_region))
        .route("/regions/{id}", patch(update_region))
        .route("/regions/{id}/admin", put(assign_admin))
        .route("/promoter/codes", get(promoter_codes).post(create_code))
        .route("/promoter/codes/{code}", patch(set_code_active))
        .route("/promoter/commissions", get(promoter_commissions))
        .with_state(upstream)
}

// ============================================================================
// Gateway under test
// ============================================================================

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Listener has no address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Test server failed");
    });
    format!("http://{}", addr)
}

pub struct TestApp {
    pub base_url: String,
    pub drafts: Arc<MemoryCheckoutStore>,
    pub upstream: SharedUpstream,
    pub fixture: Fixture,
    pub client: reqwest::Client,
}

pub async fn spawn_app() -> TestApp {
    let (data, fixture) = seed();
    let upstream = Arc::new(Mutex::new(data));
    let upstream_url = serve(stub_router(upstream.clone())).await;
    let (base_url, drafts) = spawn_gateway(upstream_url).await;

    TestApp {
        base_url,
        drafts,
        upstream,
        fixture,
        client: reqwest::Client::new(),
    }
}

/// Serve a gateway pointed at `api_base_url`; returns its URL and draft store.
pub async fn spawn_gateway(api_base_url: String) -> (String, Arc<MemoryCheckoutStore>) {
    let settings = Settings {
        api_base_url,
        upstream_timeout: Duration::from_secs(5),
        ..Settings::default()
    };
    let drafts = Arc::new(MemoryCheckoutStore::new());
    let state = AppState::new(settings, drafts.clone()).expect("Failed to build state");
    let base_url = serve(reviewcard_storefront::create_app(state)).await;
    (base_url, drafts)
}

/// A port nothing listens on, so every upstream call fails to connect.
pub async fn unreachable_upstream() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Listener has no address");
    drop(listener);
    format!("http://{}", addr)
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn with_token(builder: reqwest::RequestBuilder, token: Option<&str>) -> reqwest::RequestBuilder {
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> reqwest::Response {
        Self::with_token(self.client.get(self.url(path)), token)
            .send()
            .await
            .expect("Failed to send request")
    }

    pub async fn post(&self, path: &str, body: Value, token: Option<&str>) -> reqwest::Response {
        Self::with_token(self.client.post(self.url(path)), token)
            .json(&body)
            .send()
            .await
            .expect("Failed to send request")
    }

    pub async fn put(&self, path: &str, body: Value, token: Option<&str>) -> reqwest::Response {
        Self::with_token(self.client.put(self.url(path)), token)
            .json(&body)
            .send()
            .await
            .expect("Failed to send request")
    }

    pub async fn patch(&self, path: &str, body: Value, token: Option<&str>) -> reqwest::Response {
        Self::with_token(self.client.patch(self.url(path)), token)
            .json(&body)
            .send()
            .await
            .expect("Failed to send request")
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> reqwest::Response {
        Self::with_token(self.client.delete(self.url(path)), token)
            .send()
            .await
            .expect("Failed to send request")
    }

    pub fn upstream(&self) -> std::sync::MutexGuard<'_, Upstream> {
        self.upstream.lock().unwrap()
    }
}

pub async fn body(res: reqwest::Response) -> Value {
    res.json().await.expect("Failed to parse response")
}
