mod client_tests;
mod group_tests;
mod infrastructure_tests;
mod settlement_tests;

use crate::core::services::{AuthResponse, ExpenseService, NewUser};
use crate::infrastructure::cache::in_memory::InMemoryCache;
use crate::infrastructure::logging::in_memory::InMemoryLogging;
use crate::infrastructure::storage::in_memory::InMemoryStorage;

pub type TestService = ExpenseService<InMemoryLogging, InMemoryStorage, InMemoryCache>;

pub const TEST_SECRET: &str = "test-secret";

pub fn create_test_service() -> TestService {
    let storage = InMemoryStorage::new();
    let logging = InMemoryLogging::new();
    let cache = InMemoryCache::new();
    // Lowest cost bcrypt accepts; keeps hashing fast in tests.
    ExpenseService::new(storage, logging, cache, TEST_SECRET.to_string()).with_bcrypt_cost(4)
}

pub fn new_user(username: &str) -> NewUser {
    NewUser {
        username: username.to_string(),
        password: format!("{}-password", username),
        first_name: username.to_string(),
        last_name: "Tester".to_string(),
        email: format!("{}@example.com", username),
    }
}

pub async fn register(service: &TestService, username: &str) -> AuthResponse {
    service.register_user(new_user(username)).await.unwrap()
}
