use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::{Client, Collection};

use crate::schemas::{Expense, Group, UserNick};

const DATABASE: &str = "TravelUs";
const COLLECTION: &str = "Groups";

/// MongoDB-backed group repository: the expense data source and member
/// directory behind the service handlers. Stores only raw groups and
/// expenses; balances and settlements are always derived on read.
#[derive(Clone)]
pub struct GroupStore {
    groups: Collection<Group>,
}

impl GroupStore {
    pub fn new(client: &Client) -> Self {
        Self {
            groups: client.database(DATABASE).collection(COLLECTION),
        }
    }

    pub async fn insert(&self, group: Group) -> mongodb::error::Result<()> {
        self.groups.insert_one(group, None).await?;
        Ok(())
    }

    pub async fn find(&self, id: &str) -> mongodb::error::Result<Option<Group>> {
        self.groups.find_one(doc! { "id": id }, None).await
    }

    pub async fn list(&self) -> mongodb::error::Result<Vec<Group>> {
        self.groups.find(None, None).await?.try_collect().await
    }

    /// Adds `nick` to the group's member list; adding an existing member is
    /// a no-op. Returns `false` when no group matched.
    pub async fn add_member(&self, id: &str, nick: &UserNick) -> mongodb::error::Result<bool> {
        let result = self
            .groups
            .update_one(
                doc! { "id": id },
                doc! { "$addToSet": { "members": nick.as_str() } },
                None,
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    /// Returns `false` when no group matched.
    pub async fn add_expense(&self, id: &str, expense: &Expense) -> mongodb::error::Result<bool> {
        let result = self
            .groups
            .update_one(
                doc! { "id": id },
                doc! { "$push": { "expenses": bson::to_bson(expense)? } },
                None,
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    /// Returns `false` when the group or the expense was missing.
    pub async fn remove_expense(
        &self,
        id: &str,
        expense_id: &str,
    ) -> mongodb::error::Result<bool> {
        let result = self
            .groups
            .update_one(
                doc! { "id": id },
                doc! { "$pull": { "expenses": { "id": expense_id } } },
                None,
            )
            .await?;
        Ok(result.modified_count > 0)
    }
}
