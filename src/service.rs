//! Transport-agnostic request boundary.
//!
//! An HTTP (or any other) front end turns its requests into [`Request`]
//! values and renders the [`Response`] or [`ErrorBody`] it gets back.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::auth::{authorize_self, AccessGate};
use crate::config::LedgerConfig;
use crate::ledger::Ledger;
use crate::traits::*;
use crate::types::*;

/// Operation requested by a caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Operation {
    Create {
        #[serde(rename = "displayName")]
        display_name: String,
    },
    List,
    Find {
        id: AccountId,
    },
    Deposit {
        id: AccountId,
        amount: BigDecimal,
    },
    Transfer {
        #[serde(rename = "sourceId")]
        source_id: AccountId,
        #[serde(rename = "destinationId")]
        destination_id: AccountId,
        amount: BigDecimal,
    },
}

/// An inbound request: the operation plus the raw presented credential
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub operation: Operation,
    pub credential: Option<String>,
}

impl Request {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            credential: None,
        }
    }

    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }
}

/// Body-less success signal for transfers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Acknowledgement {
    pub status: &'static str,
}

/// Successful outcome of a request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Response {
    Account(Account),
    Accounts(Vec<Account>),
    Acknowledged(Acknowledgement),
}

impl Response {
    fn acknowledged() -> Self {
        Response::Acknowledged(Acknowledgement { status: "ok" })
    }
}

/// Caller-visible failure: an error kind, a message and a status hint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub error: ErrorKind,
    pub message: String,
    #[serde(skip)]
    pub status: u16,
}

impl From<&LedgerError> for ErrorBody {
    fn from(err: &LedgerError) -> Self {
        let kind = err.kind();
        let status = match kind {
            ErrorKind::ValidationError => 400,
            ErrorKind::MalformedCredential | ErrorKind::InvalidCredential => 401,
            ErrorKind::Forbidden => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::StoreFailure => 500,
        };
        Self {
            error: kind,
            message: err.public_message(),
            status,
        }
    }
}

/// Ledger engine and access gate wired over one shared store
pub struct LedgerService<S: AccountStore> {
    ledger: Ledger<S>,
    gate: AccessGate<S>,
}

impl<S: AccountStore + Clone> LedgerService<S> {
    /// Create a service expecting the default credential scheme
    pub fn new(storage: S) -> Self {
        Self {
            ledger: Ledger::new(storage.clone()),
            gate: AccessGate::new(storage),
        }
    }

    /// Create a service using the configured credential scheme
    pub fn from_config(storage: S, config: &LedgerConfig) -> Self {
        Self {
            ledger: Ledger::new(storage.clone()),
            gate: AccessGate::with_scheme(storage, config.credential_scheme.clone()),
        }
    }
}

impl<S: AccountStore> LedgerService<S> {
    pub fn ledger(&self) -> &Ledger<S> {
        &self.ledger
    }

    pub fn gate(&self) -> &AccessGate<S> {
        &self.gate
    }

    /// Execute a request, mapping failures to caller-visible bodies
    pub async fn handle(&self, request: Request) -> Result<Response, ErrorBody> {
        self.dispatch(request).await.map_err(|err| {
            // Store detail goes to the log only, never to the caller
            warn!(kind = err.kind().as_str(), error = %err, "request rejected");
            ErrorBody::from(&err)
        })
    }

    async fn dispatch(&self, request: Request) -> LedgerResult<Response> {
        let Request {
            operation,
            credential,
        } = request;
        let credential = credential.as_deref();

        match operation {
            Operation::Create { display_name } => self
                .ledger
                .create_account(&display_name)
                .await
                .map(Response::Account),
            Operation::List => self.ledger.list_accounts().await.map(Response::Accounts),
            Operation::Find { id } => {
                self.authorize(credential, id).await?;
                self.ledger.find_account(id).await.map(Response::Account)
            }
            Operation::Deposit { id, amount } => {
                self.authorize(credential, id).await?;
                self.ledger.deposit(id, &amount).await.map(Response::Account)
            }
            Operation::Transfer {
                source_id,
                destination_id,
                amount,
            } => {
                self.authorize(credential, source_id).await?;
                self.ledger
                    .transfer(source_id, destination_id, &amount)
                    .await
                    .map(|_| Response::acknowledged())
            }
        }
    }

    async fn authorize(&self, credential: Option<&str>, target: AccountId) -> LedgerResult<Account> {
        let caller = self.gate.authenticate(credential.unwrap_or_default()).await?;
        authorize_self(&caller, target)?;
        Ok(caller)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::AtomicUnit;
    use crate::utils::memory_storage::MemoryAccountStore;
    use async_trait::async_trait;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    async fn create(service: &LedgerService<MemoryAccountStore>, name: &str) -> Account {
        match service
            .handle(Request::new(Operation::Create {
                display_name: name.to_string(),
            }))
            .await
            .unwrap()
        {
            Response::Account(account) => account,
            other => panic!("unexpected response {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_account_json_shape() {
        let service = LedgerService::new(MemoryAccountStore::new());
        let ana = create(&service, " Ana ").await;

        let response = service
            .handle(
                Request::new(Operation::Deposit {
                    id: ana.id,
                    amount: dec("100"),
                })
                .with_credential(format!("Bearer {}", ana.credential)),
            )
            .await
            .unwrap();

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["displayName"], "Ana");
        assert_eq!(json["balance"], "100.00");
        assert_eq!(json["credential"], ana.credential.as_str());
        assert!(json.get("createdAt").is_some());
        assert!(json.get("updatedAt").is_some());
    }

    #[tokio::test]
    async fn test_transfer_acknowledgement() {
        let service = LedgerService::new(MemoryAccountStore::new());
        let ana = create(&service, "Ana").await;
        let bruno = create(&service, "Bruno").await;
        service.ledger().deposit(ana.id, &dec("10")).await.unwrap();

        let response = service
            .handle(
                Request::new(Operation::Transfer {
                    source_id: ana.id,
                    destination_id: bruno.id,
                    amount: dec("2.50"),
                })
                .with_credential(format!("Bearer {}", ana.credential)),
            )
            .await
            .unwrap();
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            serde_json::json!({"status": "ok"})
        );
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let service = LedgerService::new(MemoryAccountStore::new());
        let ana = create(&service, "Ana").await;
        let bruno = create(&service, "Bruno").await;
        let as_ana = format!("Bearer {}", ana.credential);

        let cases = vec![
            (Request::new(Operation::Create { display_name: "  ".to_string() }), 400),
            (Request::new(Operation::Find { id: ana.id }), 401),
            (Request::new(Operation::Find { id: ana.id }).with_credential("Bearer nope"), 401),
            (Request::new(Operation::Find { id: bruno.id }).with_credential(as_ana.clone()), 403),
            (
                Request::new(Operation::Deposit { id: bruno.id, amount: dec("5") })
                    .with_credential(as_ana.clone()),
                403,
            ),
            (
                Request::new(Operation::Transfer {
                    source_id: bruno.id,
                    destination_id: ana.id,
                    amount: dec("1"),
                })
                .with_credential(as_ana.clone()),
                403,
            ),
            (
                Request::new(Operation::Transfer {
                    source_id: ana.id,
                    destination_id: AccountId::new(77),
                    amount: dec("1"),
                })
                .with_credential(as_ana.clone()),
                404,
            ),
        ];

        for (request, status) in cases {
            let body = service.handle(request.clone()).await.unwrap_err();
            assert_eq!(body.status, status, "{request:?}");
        }
    }

    #[tokio::test]
    async fn test_operation_from_json() {
        let operation: Operation = serde_json::from_value(serde_json::json!({
            "kind": "transfer",
            "sourceId": 1,
            "destinationId": 2,
            "amount": "40.00"
        }))
        .unwrap();
        assert_eq!(
            operation,
            Operation::Transfer {
                source_id: AccountId::new(1),
                destination_id: AccountId::new(2),
                amount: dec("40.00"),
            }
        );
    }

    #[derive(Clone)]
    struct BrokenStore;

    #[async_trait]
    impl AccountStore for BrokenStore {
        async fn get_by_id(&self, _id: AccountId) -> LedgerResult<Option<Account>> {
            Err(LedgerError::Store("disk I/O error".to_string()))
        }

        async fn get_by_credential(&self, _credential: &str) -> LedgerResult<Option<Account>> {
            Err(LedgerError::Store("disk I/O error".to_string()))
        }

        async fn list_all(&self) -> LedgerResult<Vec<Account>> {
            Err(LedgerError::Store("disk I/O error".to_string()))
        }

        async fn create(&self, _display_name: &str) -> LedgerResult<Account> {
            Err(LedgerError::Store("UNIQUE constraint failed: accounts.credential".to_string()))
        }

        async fn run_atomic<T, F>(&self, _ids: &[AccountId], _unit: F) -> LedgerResult<T>
        where
            T: Send,
            F: FnOnce(&mut AtomicUnit) -> LedgerResult<T> + Send,
        {
            Err(LedgerError::Store("disk I/O error".to_string()))
        }
    }

    #[tokio::test]
    async fn test_store_failures_are_generic() {
        let service = LedgerService::new(BrokenStore);

        for operation in [
            Operation::Create { display_name: "Ana".to_string() },
            Operation::List,
        ] {
            let body = service.handle(Request::new(operation)).await.unwrap_err();
            assert_eq!(body.status, 500);
            assert_eq!(body.error, ErrorKind::StoreFailure);
            assert_eq!(body.message, "internal error");
        }
    }
}
