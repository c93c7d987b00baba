// src/routes/finance_routes.rs

use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Json, Router,
};
use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::{
    error::ApiError,
    finance::{self, FinanceReport},
    middleware::auth_context::AuthContext,
    models::{ApiOk, AppState, Delivery, Saved, Transaction, TransactionKind},
    routes::required,
    store::{find_in, insert_front, new_id, replace},
};

const INVALID_TRANSACTION: &str = "Todos os campos são obrigatórios e o valor deve ser positivo.";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/finance", get(finance_report))
        .route("/finance/transactions", post(create_transaction))
        .route("/finance/transactions/{transaction_id}", put(update_transaction))
}

pub async fn finance_report(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<ApiOk<FinanceReport>>, ApiError> {
    let scope = auth.session.clinic_scope()?;
    let slice = state.store.read().await.tenant_slice(scope);
    let report = finance::report(&slice.appointments, &slice.transactions, &slice.procedures);
    Ok(Json(ApiOk { data: report }))
}

#[derive(Debug, Deserialize)]
pub struct TransactionRequest {
    #[serde(rename = "descricao")]
    pub description: String,
    #[serde(rename = "valor")]
    pub amount: f64,
    #[serde(rename = "tipo")]
    pub kind: TransactionKind,
    #[serde(rename = "data")]
    pub date: NaiveDateTime,
    #[serde(rename = "categoria")]
    pub category: String,
}

impl TransactionRequest {
    fn into_transaction(self, id: String, clinic_id: &str) -> Result<Transaction, ApiError> {
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(ApiError::validation(INVALID_TRANSACTION));
        }
        Ok(Transaction {
            id,
            description: required(&self.description, INVALID_TRANSACTION)?,
            amount: self.amount,
            kind: self.kind,
            date: self.date,
            category: required(&self.category, INVALID_TRANSACTION)?,
            appointment_id: None,
            clinic_id: clinic_id.to_string(),
        })
    }
}

/// Manual ledger rows stay local; nothing is sent to the webhook.
pub async fn create_transaction(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<TransactionRequest>,
) -> Result<Json<Saved<Transaction>>, ApiError> {
    let clinic_id = auth.session.require_clinic()?;
    let transaction = req.into_transaction(new_id("manual"), clinic_id)?;

    insert_front(&mut state.store.write().await.transactions, transaction.clone());
    tracing::info!(
        transaction_id = %transaction.id,
        kind = ?transaction.kind,
        amount = transaction.amount,
        "transaction recorded"
    );

    Ok(Json(Saved {
        data: transaction,
        delivery: Delivery::LocalOnly,
    }))
}

/// Appointment revenue rows are derived and cannot be edited here.
pub async fn update_transaction(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(transaction_id): Path<String>,
    Json(req): Json<TransactionRequest>,
) -> Result<Json<Saved<Transaction>>, ApiError> {
    let clinic_id = auth.session.require_clinic()?;
    let transaction = req.into_transaction(transaction_id.clone(), clinic_id)?;

    let mut store = state.store.write().await;
    if find_in(&store.transactions, clinic_id, &transaction_id).is_none() {
        return Err(ApiError::not_found("transaction", &transaction_id));
    }
    replace(&mut store.transactions, transaction.clone());
    tracing::info!(transaction_id = %transaction.id, "transaction updated");

    Ok(Json(Saved {
        data: transaction,
        delivery: Delivery::LocalOnly,
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::{json, Value};

    use crate::models::test_helpers::{test_state, RecordingWebhook};
    use crate::routes::test_support::{get, send};

    #[tokio::test]
    async fn report_merges_revenue_and_expenses() {
        let state = test_state(RecordingWebhook::ok(Value::Null));
        let (status, body) = get(&state, "/api/v1/finance").await;
        assert_eq!(status, StatusCode::OK);
        let data = &body["data"];
        assert_eq!(data["transactions"].as_array().unwrap().len(), 4);
        assert_eq!(data["totals"]["income"], 700.0);
        assert_eq!(data["totals"]["expense"], 11350.0);
        assert_eq!(data["monthly"][0]["month"], "Jun/24");
    }

    #[tokio::test]
    async fn manual_transactions_never_call_the_webhook() {
        let hook = RecordingWebhook::ok(Value::Null);
        let state = test_state(hook.clone());
        let (status, saved) = send(
            &state,
            Method::POST,
            "/api/v1/finance/transactions",
            Some(json!({
                "descricao": "Venda de kit clareamento",
                "valor": 120.0,
                "tipo": "receita",
                "data": "2024-06-18T00:00:00",
                "categoria": "Vendas"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(saved["delivery"], "local_only");
        assert!(saved["data"]["id"].as_str().unwrap().starts_with("manual-"));
        assert!(hook.tags().is_empty());

        let (_, body) = get(&state, "/api/v1/finance").await;
        assert_eq!(body["data"]["totals"]["income"], 820.0);
    }

    #[tokio::test]
    async fn non_positive_amount_is_rejected() {
        let state = test_state(RecordingWebhook::ok(Value::Null));
        let (status, err) = send(
            &state,
            Method::POST,
            "/api/v1/finance/transactions",
            Some(json!({
                "descricao": "Estorno",
                "valor": 0.0,
                "tipo": "despesa",
                "data": "2024-06-18T00:00:00",
                "categoria": "Outros"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            err["error"]["message"],
            "Todos os campos são obrigatórios e o valor deve ser positivo."
        );
    }

    #[tokio::test]
    async fn derived_revenue_rows_are_not_editable() {
        let state = test_state(RecordingWebhook::ok(Value::Null));
        let (status, _) = send(
            &state,
            Method::PUT,
            "/api/v1/finance/transactions/at-at5",
            Some(json!({
                "descricao": "x",
                "valor": 1.0,
                "tipo": "receita",
                "data": "2024-06-18T00:00:00",
                "categoria": "x"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn expense_update_replaces_in_place() {
        let state = test_state(RecordingWebhook::ok(Value::Null));
        let (status, saved) = send(
            &state,
            Method::PUT,
            "/api/v1/finance/transactions/t1",
            Some(json!({
                "descricao": "Aluguel",
                "valor": 2600.0,
                "tipo": "despesa",
                "data": "2024-06-01T00:00:00",
                "categoria": "Custos Fixos"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(saved["data"]["valor"], 2600.0);
        assert_eq!(state.store.read().await.transactions[0].amount, 2600.0);
    }
}
