use std::sync::Arc;

use scribe_types::models::{ModifiedData, Tag};

use crate::named::{NamedOps, NamedTable};
use crate::{Database, DbResult, Deadline};

const TAGS: NamedTable = NamedTable {
    table: "tags",
    ops: NamedOps {
        create: "tag_create",
        get_all: "tag_getall",
        get_by_name: "tag_getbyname",
        get_by_id: "tag_getbyid",
        update_name: "tag_updatename",
        delete_by_id: "tag_deletebyid",
        delete_by_name: "tag_deletebyname",
    },
};

#[derive(Clone)]
pub struct TagStore {
    db: Arc<Database>,
}

impl TagStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn create(&self, deadline: &Deadline, name: &str) -> DbResult<Tag> {
        TAGS.create(&self.db, deadline, name)
    }

    pub fn get_all(&self, deadline: &Deadline) -> DbResult<Vec<Tag>> {
        TAGS.get_all(&self.db, deadline)
    }

    pub fn get_by_name(&self, deadline: &Deadline, name: &str) -> DbResult<Tag> {
        TAGS.get_by_name(&self.db, deadline, name)
    }

    pub fn get_by_id(&self, deadline: &Deadline, id: i64) -> DbResult<Tag> {
        TAGS.get_by_id(&self.db, deadline, id)
    }

    pub fn update_name(&self, deadline: &Deadline, id: i64, name: &str) -> DbResult<ModifiedData> {
        TAGS.update_name(&self.db, deadline, id, name)
    }

    pub fn delete_by_id(&self, deadline: &Deadline, id: i64) -> DbResult<ModifiedData> {
        TAGS.delete_by_id(&self.db, deadline, id)
    }

    pub fn delete_by_name(&self, deadline: &Deadline, name: &str) -> DbResult<ModifiedData> {
        TAGS.delete_by_name(&self.db, deadline, name)
    }
}
