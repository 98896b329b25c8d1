use chrono::Utc;
use devhire::domain::EntityKind;
use devhire::domain::job::Job;
use devhire::domain::ports::StoreBox;
use devhire::domain::record::{ChangeSet, Entity};
use devhire::domain::user::{User, UserRole};
use devhire::infrastructure::in_memory::InMemoryStore;
use rust_decimal_macros::dec;

#[tokio::test]
async fn test_store_as_trait_object() {
    let store: StoreBox = Box::new(InMemoryStore::new());

    // Verify Send + Sync by moving the boxed store into a task
    let handle = tokio::spawn(async move {
        let user_id = store.next_id(EntityKind::User).await.unwrap();
        let job_id = store.next_id(EntityKind::Job).await.unwrap();
        let user = User::new(user_id, "ana", UserRole::Client, Utc::now());
        let job = Job::new(job_id, user_id, "api", dec!(100), Utc::now());

        store
            .commit(ChangeSet {
                records: vec![user.into(), job.into()],
                guards: vec![],
            })
            .await
            .unwrap();

        let record = store.load(EntityKind::User, user_id).await.unwrap().unwrap();
        let user = User::decode(record).unwrap();
        let jobs = store.scan(EntityKind::Job).await.unwrap();
        (user, jobs.len())
    });

    let (user, jobs) = handle.await.unwrap();
    assert_eq!(user.name, "ana");
    assert_eq!(jobs, 1);
}
