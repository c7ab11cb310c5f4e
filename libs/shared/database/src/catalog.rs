use std::sync::Arc;

use anyhow::{anyhow, Result};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_models::catalog::{Clinic, LabTest};

use crate::supabase::SupabaseClient;

/// Read access to the clinic/test catalog plus the clinic owed-balance ledger.
pub struct CatalogRepository {
    supabase: Arc<SupabaseClient>,
}

impl CatalogRepository {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    pub async fn get_clinic(&self, clinic_id: Uuid) -> Result<Option<Clinic>> {
        debug!("Fetching clinic {}", clinic_id);

        let path = format!("/rest/v1/clinics?id=eq.{}&limit=1", clinic_id);
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None).await?;

        first_row(rows)
    }

    pub async fn get_lab_test(&self, test_id: Uuid) -> Result<Option<LabTest>> {
        debug!("Fetching lab test {}", test_id);

        let path = format!("/rest/v1/lab_tests?id=eq.{}&is_deleted=eq.false&limit=1", test_id);
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None).await?;

        first_row(rows)
    }

    /// Adds `amount` to the clinic's `total_money_owed` inside the store so
    /// concurrent claims cannot overwrite each other. Returns the new total.
    pub async fn increment_money_owed(&self, clinic_id: Uuid, amount: f64) -> Result<f64> {
        let body = json!({
            "p_clinic_id": clinic_id,
            "p_amount": amount,
        });

        let total: Value = self
            .supabase
            .request(Method::POST, "/rest/v1/rpc/increment_clinic_money_owed", Some(body))
            .await?;

        let total = total
            .as_f64()
            .ok_or_else(|| anyhow!("Unexpected ledger response: {}", total))?;

        info!("Clinic {} owed balance is now {:.2}", clinic_id, total);
        Ok(total)
    }
}

fn first_row<T: serde::de::DeserializeOwned>(rows: Vec<Value>) -> Result<Option<T>> {
    match rows.into_iter().next() {
        Some(row) => Ok(Some(serde_json::from_value(row)?)),
        None => Ok(None),
    }
}
