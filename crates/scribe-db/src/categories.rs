use std::sync::Arc;

use scribe_types::models::{ModifiedData, Category};

use crate::named::{NamedOps, NamedTable};
use crate::{Database, DbResult, Deadline};

const CATEGORIES: NamedTable = NamedTable {
    table: "categories",
    ops: NamedOps {
        create: "category_create",
        get_all: "category_getall",
        get_by_name: "category_getbyname",
        get_by_id: "category_getbyid",
        update_name: "category_updatename",
        delete_by_id: "category_deletebyid",
        delete_by_name: "category_deletebyname",
    },
};

#[derive(Clone)]
pub struct CategoryStore {
    db: Arc<Database>,
}

impl CategoryStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn create(&self, deadline: &Deadline, name: &str) -> DbResult<Category> {
        CATEGORIES.create(&self.db, deadline, name)
    }

    pub fn get_all(&self, deadline: &Deadline) -> DbResult<Vec<Category>> {
        CATEGORIES.get_all(&self.db, deadline)
    }

    pub fn get_by_name(&self, deadline: &Deadline, name: &str) -> DbResult<Category> {
        CATEGORIES.get_by_name(&self.db, deadline, name)
    }

    pub fn get_by_id(&self, deadline: &Deadline, id: i64) -> DbResult<Category> {
        CATEGORIES.get_by_id(&self.db, deadline, id)
    }

    pub fn update_name(&self, deadline: &Deadline, id: i64, name: &str) -> DbResult<ModifiedData> {
        CATEGORIES.update_name(&self.db, deadline, id, name)
    }

    pub fn delete_by_id(&self, deadline: &Deadline, id: i64) -> DbResult<ModifiedData> {
        CATEGORIES.delete_by_id(&self.db, deadline, id)
    }

    pub fn delete_by_name(&self, deadline: &Deadline, name: &str) -> DbResult<ModifiedData> {
        CATEGORIES.delete_by_name(&self.db, deadline, name)
    }
}
