//! In-process store.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{
    sort_members, sort_records, AttendanceStore, InsertOutcome, StoreError, StoreResult,
};
use crate::model::{
    is_valid_classroom_id, is_valid_user_id, AttendanceKey, AttendanceRecord, Classroom,
    UserProfile,
};

#[derive(Debug, Default)]
struct Tables {
    classrooms: BTreeMap<String, Classroom>,
    users: HashMap<String, UserProfile>,
    records: BTreeMap<AttendanceKey, AttendanceRecord>,
}

/// Store that keeps all documents in memory.
///
/// Conditional inserts run under the write lock, so they are atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of attendance records held.
    pub async fn record_count(&self) -> usize {
        self.tables.read().await.records.len()
    }
}

#[async_trait]
impl AttendanceStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn get_classroom(&self, id: &str) -> StoreResult<Option<Classroom>> {
        Ok(self.tables.read().await.classrooms.get(id).cloned())
    }

    async fn list_classrooms(&self) -> StoreResult<Vec<Classroom>> {
        Ok(self.tables.read().await.classrooms.values().cloned().collect())
    }

    async fn insert_classroom_if_absent(&self, classroom: &Classroom) -> StoreResult<InsertOutcome> {
        if !is_valid_classroom_id(&classroom.id) {
            return Err(StoreError::InvalidKey(format!("classroom '{}'", classroom.id)));
        }
        let mut tables = self.tables.write().await;
        if tables.classrooms.contains_key(&classroom.id) {
            return Ok(InsertOutcome::AlreadyExists);
        }
        tables
            .classrooms
            .insert(classroom.id.clone(), classroom.clone());
        Ok(InsertOutcome::Inserted)
    }

    async fn get_user_profile(&self, id: &str) -> StoreResult<Option<UserProfile>> {
        Ok(self.tables.read().await.users.get(id).cloned())
    }

    async fn put_user_profile(&self, profile: &UserProfile) -> StoreResult<()> {
        if !is_valid_user_id(&profile.id) {
            return Err(StoreError::InvalidKey(format!("user '{}'", profile.id)));
        }
        self.tables
            .write()
            .await
            .users
            .insert(profile.id.clone(), profile.clone());
        Ok(())
    }

    async fn list_classroom_members(&self, classroom_id: &str) -> StoreResult<Vec<UserProfile>> {
        let mut members: Vec<UserProfile> = self
            .tables
            .read()
            .await
            .users
            .values()
            .filter(|p| p.belongs_to(classroom_id))
            .cloned()
            .collect();
        sort_members(&mut members);
        Ok(members)
    }

    async fn record_exists(&self, key: &AttendanceKey) -> StoreResult<bool> {
        Ok(self.tables.read().await.records.contains_key(key))
    }

    async fn insert_record_if_absent(&self, record: &AttendanceRecord) -> StoreResult<InsertOutcome> {
        let key = record.key();
        if !is_valid_classroom_id(&key.classroom_id) || !is_valid_user_id(&key.user_id) {
            return Err(StoreError::InvalidKey(format!("attendance record '{key}'")));
        }
        let mut tables = self.tables.write().await;
        if tables.records.contains_key(&key) {
            return Ok(InsertOutcome::AlreadyExists);
        }
        tables.records.insert(key, record.clone());
        Ok(InsertOutcome::Inserted)
    }

    async fn list_records(&self, classroom_id: &str) -> StoreResult<Vec<AttendanceRecord>> {
        let mut records: Vec<AttendanceRecord> = self
            .tables
            .read()
            .await
            .records
            .values()
            .filter(|r| r.classroom_id == classroom_id)
            .cloned()
            .collect();
        sort_records(&mut records);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{NaiveDate, Utc};

    use super::*;
    use crate::geo::Coordinate;

    fn classroom(id: &str) -> Classroom {
        Classroom {
            id: id.into(),
            anchor: Coordinate::new(1.0, 2.0).unwrap(),
            created_at: Utc::now(),
        }
    }

    fn record(classroom_id: &str, day: u32, user_id: &str) -> AttendanceRecord {
        let date = NaiveDate::from_ymd_opt(2025, 1, day).unwrap();
        AttendanceRecord::new(AttendanceKey::new(classroom_id, date, user_id), Utc::now())
    }

    #[tokio::test]
    async fn test_classroom_insert_is_conditional() {
        let store = MemoryStore::new();
        assert_eq!(
            store.insert_classroom_if_absent(&classroom("RoomA")).await.unwrap(),
            InsertOutcome::Inserted
        );
        assert_eq!(
            store.insert_classroom_if_absent(&classroom("RoomA")).await.unwrap(),
            InsertOutcome::AlreadyExists
        );
        assert_eq!(store.list_classrooms().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_record_insert_is_conditional() {
        let store = MemoryStore::new();
        let r = record("RoomA", 15, "u1");
        assert!(!store.record_exists(&r.key()).await.unwrap());
        assert_eq!(
            store.insert_record_if_absent(&r).await.unwrap(),
            InsertOutcome::Inserted
        );
        assert!(store.record_exists(&r.key()).await.unwrap());
        assert_eq!(
            store.insert_record_if_absent(&r).await.unwrap(),
            InsertOutcome::AlreadyExists
        );
        assert_eq!(store.record_count().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_inserts_admit_one() {
        let store = Arc::new(MemoryStore::new());
        let r = record("RoomA", 15, "u1");

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            let r = r.clone();
            handles.push(tokio::spawn(async move {
                store.insert_record_if_absent(&r).await.unwrap()
            }));
        }

        let mut inserted = 0;
        for handle in handles {
            if handle.await.unwrap() == InsertOutcome::Inserted {
                inserted += 1;
            }
        }
        assert_eq!(inserted, 1);
        assert_eq!(store.record_count().await, 1);
    }

    #[tokio::test]
    async fn test_unaddressable_ids_are_refused() {
        let store = MemoryStore::new();

        assert!(matches!(
            store.insert_classroom_if_absent(&classroom("Café")).await,
            Err(StoreError::InvalidKey(_))
        ));
        assert!(store.list_classrooms().await.unwrap().is_empty());

        let profile = UserProfile {
            id: "u 1".into(),
            name: "Ada".into(),
            email: "ada@uni.edu".into(),
            is_admin: false,
            classroom_id: Some("RoomA".into()),
        };
        assert!(matches!(
            store.put_user_profile(&profile).await,
            Err(StoreError::InvalidKey(_))
        ));
        assert_eq!(store.get_user_profile("u 1").await.unwrap(), None);

        assert!(matches!(
            store.insert_record_if_absent(&record("Room/A", 15, "u1")).await,
            Err(StoreError::InvalidKey(_))
        ));
        assert_eq!(store.record_count().await, 0);
    }

    #[tokio::test]
    async fn test_list_records_filters_and_sorts() {
        let store = MemoryStore::new();
        store.insert_record_if_absent(&record("RoomA", 16, "u1")).await.unwrap();
        store.insert_record_if_absent(&record("RoomA", 15, "u2")).await.unwrap();
        store.insert_record_if_absent(&record("RoomA", 15, "u1")).await.unwrap();
        store.insert_record_if_absent(&record("RoomB", 15, "u3")).await.unwrap();

        let records = store.list_records("RoomA").await.unwrap();
        let keys: Vec<String> = records.iter().map(|r| r.key().to_string()).collect();
        assert_eq!(
            keys,
            vec!["RoomA/2025-01-15_u1", "RoomA/2025-01-15_u2", "RoomA/2025-01-16_u1"]
        );
    }

    #[tokio::test]
    async fn test_members_sorted_by_name() {
        let store = MemoryStore::new();
        for (id, name, class) in [("u1", "Zed", "RoomA"), ("u2", "Amy", "RoomA"), ("u3", "Bob", "RoomB")] {
            store
                .put_user_profile(&UserProfile {
                    id: id.into(),
                    name: name.into(),
                    email: format!("{}@uni.edu", name.to_lowercase()),
                    is_admin: false,
                    classroom_id: Some(class.into()),
                })
                .await
                .unwrap();
        }

        let names: Vec<String> = store
            .list_classroom_members("RoomA")
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Amy", "Zed"]);
    }
}
