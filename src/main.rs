use actix_cors::Cors;
use actix_web::{delete, get, post, put, web, App, HttpResponse, HttpServer};
use chrono::Utc;
use mongodb::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use travelus::balance::compute_balance_from_group;
use travelus::error::LedgerError;
use travelus::exchange::plan_settlement;
use travelus::schemas::{Expense, Group, Money, UserNick};
use travelus::store::GroupStore;

#[derive(Deserialize, Serialize)]
struct GroupPayload {
    name: String,
    members: Vec<UserNick>,
}

#[derive(Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExpensePayload {
    title: String,
    amount: Money,
    paid_by: UserNick,
    participants: Vec<UserNick>,
}

#[derive(Deserialize, Serialize)]
struct MemberPayload {
    nick: UserNick,
}

fn group_not_found() -> HttpResponse {
    HttpResponse::NotFound().body("Couldn't find the desired group")
}

fn db_error(err: mongodb::error::Error) -> HttpResponse {
    error!(error = %err, "database operation failed");
    HttpResponse::InternalServerError().body(err.to_string())
}

// Invalid expenses and unknown members are the client's mistake; an
// unbalanced sheet can only come from a bug on our side.
fn ledger_error(err: LedgerError) -> HttpResponse {
    let body = json!({ "code": err.code(), "message": err.to_string() });
    match err {
        LedgerError::UnbalancedInput(_) => {
            error!(error = %err, "balance invariant violated");
            HttpResponse::InternalServerError().json(body)
        }
        _ => HttpResponse::UnprocessableEntity().json(body),
    }
}

#[put("/groups/{id}")]
async fn add_group(
    store: web::Data<GroupStore>,
    id: web::Path<String>,
    json: web::Json<GroupPayload>,
) -> HttpResponse {
    let payload = json.into_inner();
    let group = Group {
        id: id.into_inner(),
        name: payload.name,
        members: payload.members,
        expenses: vec![],
    };
    match store.insert(group).await {
        Ok(()) => HttpResponse::Ok().body("Group added"),
        Err(err) => db_error(err),
    }
}

#[get("/groups")]
async fn list_groups(store: web::Data<GroupStore>) -> HttpResponse {
    match store.list().await {
        Ok(groups) => HttpResponse::Ok().json(groups),
        Err(err) => db_error(err),
    }
}

#[get("/groups/{id}")]
async fn get_group(store: web::Data<GroupStore>, id: web::Path<String>) -> HttpResponse {
    match store.find(&id).await {
        Ok(Some(group)) => HttpResponse::Ok().json(group),
        Ok(None) => group_not_found(),
        Err(err) => db_error(err),
    }
}

#[post("/groups/{id}/members")]
async fn add_member(
    store: web::Data<GroupStore>,
    id: web::Path<String>,
    json: web::Json<MemberPayload>,
) -> HttpResponse {
    match store.add_member(&id, &json.nick).await {
        Ok(true) => HttpResponse::Ok().body("Member added"),
        Ok(false) => group_not_found(),
        Err(err) => db_error(err),
    }
}

#[get("/groups/{id}/expenses")]
async fn list_expenses(store: web::Data<GroupStore>, id: web::Path<String>) -> HttpResponse {
    match store.find(&id).await {
        Ok(Some(group)) => HttpResponse::Ok().json(group.expenses),
        Ok(None) => group_not_found(),
        Err(err) => db_error(err),
    }
}

#[post("/groups/{id}/expenses")]
async fn add_expense(
    store: web::Data<GroupStore>,
    id: web::Path<String>,
    json: web::Json<ExpensePayload>,
) -> HttpResponse {
    let group = match store.find(&id).await {
        Ok(Some(group)) => group,
        Ok(None) => return group_not_found(),
        Err(err) => return db_error(err),
    };

    let payload = json.into_inner();
    let expense = match Expense::try_new(
        Uuid::new_v4().to_string(),
        payload.title,
        payload.amount,
        payload.paid_by,
        payload.participants,
        Utc::now(),
    ) {
        Ok(expense) => expense,
        Err(err) => return ledger_error(err),
    };

    if let Some(nick) = expense
        .referenced_members()
        .find(|nick| !group.members.contains(*nick))
    {
        return ledger_error(LedgerError::UnknownMember {
            expense: expense.id.clone(),
            nick: nick.clone(),
        });
    }

    match store.add_expense(&id, &expense).await {
        Ok(true) => HttpResponse::Ok().json(expense),
        Ok(false) => group_not_found(),
        Err(err) => db_error(err),
    }
}

#[delete("/groups/{id}/expenses/{expense_id}")]
async fn remove_expense(
    store: web::Data<GroupStore>,
    path: web::Path<(String, String)>,
) -> HttpResponse {
    let (id, expense_id) = path.into_inner();
    match store.remove_expense(&id, &expense_id).await {
        Ok(true) => HttpResponse::Ok().body("Expense removed"),
        Ok(false) => HttpResponse::NotFound().body("Couldn't find the desired expense"),
        Err(err) => db_error(err),
    }
}

#[get("/groups/{id}/balance")]
async fn get_balance(store: web::Data<GroupStore>, id: web::Path<String>) -> HttpResponse {
    match store.find(&id).await {
        Ok(Some(group)) => match compute_balance_from_group(&group) {
            Ok(balances) => HttpResponse::Ok().json(balances),
            Err(err) => ledger_error(err),
        },
        Ok(None) => group_not_found(),
        Err(err) => db_error(err),
    }
}

#[get("/groups/{id}/settle")]
async fn get_settlements(store: web::Data<GroupStore>, id: web::Path<String>) -> HttpResponse {
    let group = match store.find(&id).await {
        Ok(Some(group)) => group,
        Ok(None) => return group_not_found(),
        Err(err) => return db_error(err),
    };

    match compute_balance_from_group(&group).and_then(|balances| plan_settlement(&balances)) {
        Ok(transfers) => HttpResponse::Ok().json(transfers),
        Err(err) => ledger_error(err),
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let uri = std::env::var("MONGODB_URI").expect("You need to add the MONGODB_URI to the env");
    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_owned());

    let client = Client::with_uri_str(&uri).await.expect("failed to connect");
    let store = GroupStore::new(&client);
    info!(%bind_addr, "connected, starting server");

    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .app_data(web::Data::new(store.clone()))
            .service(add_group)
            .service(list_groups)
            .service(get_group)
            .service(add_member)
            .service(list_expenses)
            .service(add_expense)
            .service(remove_expense)
            .service(get_balance)
            .service(get_settlements)
    })
    .bind(bind_addr)?
    .run()
    .await
}
