mod support;

use std::collections::HashSet;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use entity_repository::store::memory::MemoryCollection;
use entity_repository::store::{StoreCollection, StoreErrorKind};
use entity_repository::{
    field, ConnectionRegistry, Filter, IdentityRepository, RepositoryConfig, WriteError,
    WriteOperation,
};
use support::{Category, FaultyCollection};

fn repository() -> IdentityRepository<Category> {
    IdentityRepository::with_collection(
        Arc::new(MemoryCollection::new("Categories")),
        &RepositoryConfig::default(),
    )
    .unwrap()
}

fn faulty_repository(config: &RepositoryConfig) -> (Arc<FaultyCollection>, IdentityRepository<Category>) {
    let faulty = FaultyCollection::new("Categories");
    let repo = IdentityRepository::with_collection(faulty.clone(), config).unwrap();
    (faulty, repo)
}

#[test]
fn ids_are_allocated_sequentially_from_one() {
    let repo = repository();

    for expected in 1..=5 {
        let mut category = Category::new("tools", 1);
        let id = repo.save(&mut category).unwrap();
        assert_eq!(id, expected);
        assert_eq!(category.id, expected);
    }
}

#[test]
fn allocation_continues_after_the_highest_stored_id() {
    let repo = repository();
    repo.collection()
        .insert_one(serde_json::json!({ "id": 41, "name": "imported", "rank": 0 }))
        .unwrap();

    assert_eq!(repo.save(&mut Category::new("next", 0)).unwrap(), 42);
}

#[test]
fn saved_entities_round_trip() {
    let repo = repository();
    let mut garden = Category::new("garden", 3);
    let id = repo.save(&mut garden).unwrap();

    assert_eq!(repo.get(&id).unwrap(), Some(garden));
    assert_eq!(repo.get(&99).unwrap(), None);
}

#[test]
fn saving_an_existing_entity_updates_it_in_place() {
    let repo = repository();
    let mut garden = Category::new("garden", 3);
    let id = repo.save(&mut garden).unwrap();

    garden.name = "outdoor".to_string();
    assert_eq!(repo.save(&mut garden).unwrap(), id);

    assert_eq!(repo.count().unwrap(), 1);
    assert_eq!(repo.get(&id).unwrap().unwrap().name, "outdoor");
}

#[test]
fn updating_a_missing_entity_still_returns_its_id() {
    let repo = repository();
    let mut ghost = Category {
        id: 17,
        name: "ghost".to_string(),
        rank: 0,
    };

    assert_eq!(repo.save(&mut ghost).unwrap(), 17);
    assert_eq!(repo.count().unwrap(), 0);
}

#[test]
fn lost_races_are_retried_with_a_fresh_id() {
    let (faulty, repo) = faulty_repository(&RepositoryConfig::default());
    repo.save(&mut Category::new("first", 1)).unwrap();

    faulty.lose_next_inserts(2);
    let mut contested = Category::new("contested", 2);
    let id = repo.save(&mut contested).unwrap();

    // ids 2 and 3 went to the competing writer
    assert_eq!(id, 4);
    assert_eq!(contested.id, 4);
    assert_eq!(faulty.insert_calls(), 4);

    let ids: HashSet<i64> = repo
        .get_all(0, 1)
        .unwrap()
        .into_iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(ids, HashSet::from([1, 2, 3, 4]));
    assert_eq!(repo.count_where(&field("competitor").eq(true)).unwrap(), 2);
}

#[test]
fn exhausted_retries_give_the_sentinel_and_keep_the_entity_unchanged() {
    let config = RepositoryConfig::default().with_max_insert_attempts(3);
    let (faulty, repo) = faulty_repository(&config);
    faulty.always_collide(true);

    let mut category = Category::new("unlucky", 1);
    let err = repo.save(&mut category).unwrap_err();
    assert!(matches!(
        err,
        WriteError::RetriesExhausted { ref collection, attempts: 3 } if collection == "Categories"
    ));
    assert_eq!(category.id, 0);
    assert_eq!(faulty.insert_calls(), 3);

    assert_eq!(repo.save_or_sentinel(&mut category), -1);
    assert_eq!(category.id, 0);
    assert_eq!(repo.count().unwrap(), 0);
}

#[test]
fn write_failures_are_reported_to_listeners() {
    let (faulty, repo) = faulty_repository(&RepositoryConfig::default());

    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    repo.on_write_failure(move |failure| {
        let _ = tx.lock().unwrap().send(failure);
    });

    faulty.fail_writes(true);
    assert_eq!(repo.save_or_sentinel(&mut Category::new("lost", 1)), -1);

    let failure = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(failure.collection, "Categories");
    assert_eq!(failure.operation, WriteOperation::Insert);
    assert!(failure.error.to_string().contains("write refused"));
}

#[test]
fn collisions_that_recover_are_not_reported() {
    let (faulty, repo) = faulty_repository(&RepositoryConfig::default());

    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    repo.on_write_failure(move |failure| {
        let _ = tx.lock().unwrap().send(failure);
    });

    faulty.lose_next_inserts(1);
    repo.save(&mut Category::new("contested", 1)).unwrap();

    assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
}

#[test]
fn removed_listeners_are_not_called() {
    let (faulty, repo) = faulty_repository(&RepositoryConfig::default());

    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    let id = repo.on_write_failure(move |failure| {
        let _ = tx.lock().unwrap().send(failure);
    });
    assert!(repo.remove_write_failure_listener(&id));

    faulty.fail_writes(true);
    assert!(repo.delete_where(&Filter::All).is_err());
    assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
}

#[test]
fn concurrent_writers_never_share_an_id() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 25;

    let registry = ConnectionRegistry::in_memory();
    let config = RepositoryConfig::new("mongodb://localhost/race").with_max_insert_attempts(10_000);
    let repo = IdentityRepository::<Category>::connect(&registry, &config).unwrap();

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let repo = repo.clone();
            thread::spawn(move || {
                (0..PER_THREAD)
                    .map(|i| {
                        repo.save(&mut Category::new(&format!("{t}-{i}"), i as u32))
                            .unwrap()
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let ids: Vec<i64> = handles
        .into_iter()
        .flat_map(|handle| handle.join().unwrap())
        .collect();
    let unique: HashSet<i64> = ids.iter().copied().collect();

    assert_eq!(ids.len(), THREADS * PER_THREAD);
    assert_eq!(unique.len(), ids.len());
    assert_eq!(repo.count().unwrap(), (THREADS * PER_THREAD) as u64);
    assert_eq!(unique, (1..=(THREADS * PER_THREAD) as i64).collect());
}

#[test]
fn delete_removes_only_that_entity() {
    let repo = repository();
    let mut keep = Category::new("keep", 1);
    let mut gone = Category::new("gone", 2);
    repo.save(&mut keep).unwrap();
    repo.save(&mut gone).unwrap();

    assert_eq!(repo.delete(&gone).unwrap(), 1);
    assert_eq!(repo.delete(&gone).unwrap(), 0);
    assert_eq!(repo.get_all(0, 1).unwrap(), vec![keep]);
}

fn failure_channel(repo: &IdentityRepository<Category>) -> mpsc::Receiver<entity_repository::WriteFailure> {
    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    repo.on_write_failure(move |failure| {
        let _ = tx.lock().unwrap().send(failure);
    });
    rx
}

#[test]
fn failed_updates_give_the_sentinel_and_keep_the_stored_entity() {
    let (faulty, repo) = faulty_repository(&RepositoryConfig::default());
    let mut garden = Category::new("garden", 3);
    let id = repo.save(&mut garden).unwrap();
    let failures = failure_channel(&repo);

    faulty.fail_writes(true);
    garden.name = "outdoor".to_string();
    assert_eq!(repo.save_or_sentinel(&mut garden), -1);
    assert_eq!(garden.id, id);

    let failure = failures.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(failure.operation, WriteOperation::Update);
    assert!(matches!(failure.error, WriteError::Store(_)));

    faulty.fail_writes(false);
    assert_eq!(repo.get(&id).unwrap().unwrap().name, "garden");
}

#[test]
fn failed_deletes_are_returned_and_reported() {
    let (faulty, repo) = faulty_repository(&RepositoryConfig::default());
    let mut garden = Category::new("garden", 3);
    repo.save(&mut garden).unwrap();
    let failures = failure_channel(&repo);

    faulty.fail_writes(true);
    assert!(matches!(repo.delete(&garden), Err(WriteError::Store(_))));

    let failure = failures.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(failure.collection, "Categories");
    assert_eq!(failure.operation, WriteOperation::Delete);

    faulty.fail_writes(false);
    assert_eq!(repo.count().unwrap(), 1);
}

#[test]
fn listeners_can_tell_exhausted_retries_from_store_failures() {
    let config = RepositoryConfig::default().with_max_insert_attempts(2);
    let (faulty, repo) = faulty_repository(&config);
    let failures = failure_channel(&repo);

    faulty.always_collide(true);
    assert_eq!(repo.save_or_sentinel(&mut Category::new("unlucky", 1)), -1);
    let failure = failures.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(
        failure.error,
        WriteError::RetriesExhausted {
            collection: "Categories".to_string(),
            attempts: 2,
        }
    );

    faulty.always_collide(false);
    faulty.fail_writes(true);
    assert_eq!(repo.save_or_sentinel(&mut Category::new("refused", 1)), -1);
    let failure = failures.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(matches!(
        failure.error,
        WriteError::Store(ref err) if err.kind() == StoreErrorKind::Backend
    ));
}
