//! Parent/child writes that must land or fail together.
//!
//! A resource such as a security group owns rows in other tables: rules
//! whose table depends on the vendor, plus tables every vendor shares.
//! [`CascadePlan`] records those children; [`Orm::delete_with_children`]
//! removes them before their parents in one unit of work.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use hcm_core::{Kit, Vendor, VendorRegistry};
use hcm_data::list::MAX_BATCH_DELETE_IDS;
use hcm_data::{BasePage, DataError, PageSqlOption, Table};
use hcm_filter::Expression;
use sqlx::any::AnyRow;
use sqlx::FromRow;
use tracing::info;

use crate::dao::Dao;
use crate::orm::Orm;
use crate::tx::Tx;

/// A child table keyed by its parent's id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeChild {
    pub table: String,
    /// Column holding the parent id.
    pub parent_column: String,
}

impl CascadeChild {
    pub fn new(table: impl Into<String>, parent_column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            parent_column: parent_column.into(),
        }
    }
}

/// The children of one parent table.
#[derive(Debug, Clone)]
pub struct CascadePlan {
    parent: String,
    /// Parent column naming the vendor, used to pick vendor children.
    discriminator: String,
    common: Vec<CascadeChild>,
    by_vendor: VendorRegistry<Vec<CascadeChild>>,
}

impl CascadePlan {
    pub fn new(parent: impl Into<String>) -> Self {
        Self {
            parent: parent.into(),
            discriminator: "vendor".to_string(),
            common: Vec::new(),
            by_vendor: VendorRegistry::new(),
        }
    }

    pub fn with_discriminator(mut self, column: impl Into<String>) -> Self {
        self.discriminator = column.into();
        self
    }

    /// A child table every vendor has.
    pub fn with_common(mut self, child: CascadeChild) -> Self {
        self.common.push(child);
        self
    }

    /// A child table only `vendor`'s parents have.
    pub fn with_vendor(mut self, vendor: Vendor, child: CascadeChild) -> Self {
        let mut children = self.by_vendor.get(vendor).cloned().unwrap_or_default();
        children.push(child);
        self.by_vendor.register(vendor, children);
        self
    }

    pub fn parent(&self) -> &str {
        &self.parent
    }

    /// Vendor children first, then common children.
    pub fn children_of(&self, vendor: Vendor) -> Vec<&CascadeChild> {
        let vendor_children = self.by_vendor.get(vendor).map(Vec::as_slice).unwrap_or_default();
        vendor_children.iter().chain(&self.common).collect()
    }
}

impl Orm {
    /// Insert `parents` and the children built from each inserted parent in
    /// one unit of work. Returns the parent ids in order.
    pub async fn create_with_children<P, C, F>(
        &self,
        kt: &Kit,
        parents: Vec<P>,
        build_children: F,
    ) -> Result<Vec<String>, DataError>
    where
        P: Table + Clone + for<'r> FromRow<'r, AnyRow>,
        C: Table + for<'r> FromRow<'r, AnyRow>,
        F: Fn(&P) -> Vec<C> + Send + Sync + 'static,
    {
        let parent_dao = Dao::<P>::new(self.clone());
        let child_dao = Dao::<C>::new(self.clone());
        let build_children = Arc::new(build_children);
        let kit = kt.clone();

        self.auto_txn(kt, move |tx, _opt| {
            let parent_dao = parent_dao.clone();
            let child_dao = child_dao.clone();
            let build_children = build_children.clone();
            let kit = kit.clone();
            let mut rows = parents.clone();
            Box::pin(async move {
                let ids = parent_dao.batch_create_with_tx(&kit, tx, &mut rows).await?;
                let mut children: Vec<C> = rows.iter().flat_map(|p| build_children(p)).collect();
                if !children.is_empty() {
                    child_dao.batch_create_with_tx(&kit, tx, &mut children).await?;
                }
                Ok(ids)
            })
        })
        .await
    }

    /// Delete the parents matching `filter` and, children first, every row
    /// that references them. Returns the number of parents deleted.
    pub async fn delete_with_children(
        &self,
        kt: &Kit,
        filter: &Expression,
        plan: &CascadePlan,
    ) -> Result<u64, DataError> {
        if filter.is_empty() {
            return Err(DataError::invalid(format!(
                "delete {}: filter is required",
                plan.parent
            )));
        }

        let groups = self.group_parents(kt, filter, plan).await?;
        if groups.is_empty() {
            return Ok(0);
        }

        let orm = self.clone();
        let kit = kt.clone();
        let txn_plan = plan.clone();
        let deleted = self
            .auto_txn(kt, move |tx, _opt| {
                let orm = orm.clone();
                let kit = kit.clone();
                let plan = txn_plan.clone();
                let groups = groups.clone();
                Box::pin(async move {
                    let mut deleted = 0;
                    for (vendor, ids) in &groups {
                        for child in plan.children_of(*vendor) {
                            orm.delete_in(&kit, tx, &child.table, &child.parent_column, ids)
                                .await?;
                        }
                        deleted += orm.delete_in(&kit, tx, &plan.parent, "id", ids).await?;
                    }
                    Ok(deleted)
                })
            })
            .await?;

        info!(rid = %kt.rid, table = %plan.parent, deleted, "cascade delete done");
        Ok(deleted)
    }

    /// Matching parent ids grouped by vendor, read outside the transaction.
    async fn group_parents(
        &self,
        kt: &Kit,
        filter: &Expression,
        plan: &CascadePlan,
    ) -> Result<BTreeMap<Vendor, Vec<String>>, DataError> {
        let stmt = self.query(&plan.parent).build_select(
            &["id", plan.discriminator.as_str()],
            filter,
            &BasePage::unlimited(),
            &PageSqlOption::default(),
        )?;
        let rows: Vec<(String, Option<String>)> = self.select(kt, self.pool(), "list", stmt).await?;

        let mut groups: BTreeMap<Vendor, Vec<String>> = BTreeMap::new();
        for (id, vendor) in rows {
            let vendor = vendor
                .as_deref()
                .and_then(|v| Vendor::from_str(v).ok())
                .ok_or_else(|| {
                    DataError::invalid(format!(
                        "{} {id} has unsupported {}: {}",
                        plan.parent,
                        plan.discriminator,
                        vendor.as_deref().unwrap_or("null")
                    ))
                })?;
            groups.entry(vendor).or_default().push(id);
        }
        Ok(groups)
    }

    /// `DELETE FROM table WHERE column IN (ids)`, in chunks.
    async fn delete_in(
        &self,
        kt: &Kit,
        tx: &mut Tx,
        table: &str,
        column: &str,
        ids: &[String],
    ) -> Result<u64, DataError> {
        let mut affected = 0;
        for chunk in ids.chunks(MAX_BATCH_DELETE_IDS) {
            let filter = Expression::contains_in(column, chunk.iter().cloned());
            let stmt = self.query(table).build_delete(&filter)?;
            affected += self.execute(kt, tx.as_mut(), "delete", stmt).await?;
        }
        Ok(affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn children_of_vendor_then_common() {
        let plan = CascadePlan::new("security_group")
            .with_common(CascadeChild::new("security_group_cvm_rel", "security_group_id"))
            .with_vendor(Vendor::TCloud, CascadeChild::new("tcloud_security_group_rule", "security_group_id"))
            .with_vendor(Vendor::Aws, CascadeChild::new("aws_security_group_rule", "security_group_id"));

        let tables: Vec<&str> = plan.children_of(Vendor::TCloud).iter().map(|c| c.table.as_str()).collect();
        assert_eq!(tables, vec!["tcloud_security_group_rule", "security_group_cvm_rel"]);

        let tables: Vec<&str> = plan.children_of(Vendor::Gcp).iter().map(|c| c.table.as_str()).collect();
        assert_eq!(tables, vec!["security_group_cvm_rel"]);
    }
}
