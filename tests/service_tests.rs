use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use crudbase::storage::{DocumentStore, PageRequest, StorePage, WriteOutcome};
use crudbase::{
    CrudError, CrudService, InMemoryDocumentStore, Record, RecordId, RecordMapper, RecordMeta,
    RetryLimit, RetryPolicy, VersionedRepository,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

#[derive(Debug, Clone)]
struct Person {
    meta: RecordMeta,
    name: String,
    city: String,
}

impl Record for Person {
    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct PersonDto {
    id: Option<String>,
    version: Option<u64>,
    name: Option<String>,
    city: Option<String>,
    archived: bool,
}

struct PersonMapper;

impl RecordMapper<PersonDto, Person> for PersonMapper {
    fn map_to_external(&self, person: &Person) -> crudbase::Result<PersonDto> {
        Ok(PersonDto {
            id: person.id().map(ToString::to_string),
            version: person.version(),
            name: Some(person.name.clone()),
            city: Some(person.city.clone()),
            archived: person.is_archived(),
        })
    }

    fn map_to_stored(&self, dto: &PersonDto) -> crudbase::Result<Person> {
        Ok(Person {
            meta: RecordMeta {
                id: dto.id.as_deref().map(RecordId::from),
                version: dto.version,
                ..RecordMeta::new()
            },
            name: dto.name.clone().unwrap_or_default(),
            city: dto.city.clone().unwrap_or_default(),
        })
    }

    fn patch_stored_from_external(
        &self,
        person: &mut Person,
        dto: &PersonDto,
    ) -> crudbase::Result<()> {
        if let Some(name) = &dto.name {
            person.name = name.clone();
        }
        if let Some(city) = &dto.city {
            person.city = city.clone();
        }
        Ok(())
    }
}

/// Store that lets another writer bump the record right before the first
/// conditional write, then behaves normally.
struct InterferingStore {
    inner: InMemoryDocumentStore<Person>,
    armed: AtomicBool,
    conditional_writes: AtomicU32,
}

impl InterferingStore {
    fn new() -> Self {
        Self {
            inner: InMemoryDocumentStore::new(),
            armed: AtomicBool::new(false),
            conditional_writes: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl DocumentStore<Person> for InterferingStore {
    async fn find_by_id(&self, id: &RecordId) -> crudbase::Result<Option<Person>> {
        self.inner.find_by_id(id).await
    }

    async fn find_page(&self, request: PageRequest) -> crudbase::Result<StorePage<Person>> {
        self.inner.find_page(request).await
    }

    async fn insert(&self, record: Person) -> crudbase::Result<Person> {
        self.inner.insert(record).await
    }

    async fn replace_if_version(
        &self,
        record: Person,
        expected: Option<u64>,
    ) -> crudbase::Result<WriteOutcome<Person>> {
        self.conditional_writes.fetch_add(1, Ordering::SeqCst);
        if self.armed.swap(false, Ordering::SeqCst) {
            if let Some(id) = record.id() {
                if let Some(mut rival) = self.inner.find_by_id(id).await? {
                    rival.city = "rival".to_string();
                    let version = rival.version();
                    self.inner.replace_if_version(rival, version).await?;
                }
            }
        }
        self.inner.replace_if_version(record, expected).await
    }
}

type MemoryService = CrudService<PersonDto, Person, InMemoryDocumentStore<Person>, PersonMapper>;

fn memory_service() -> MemoryService {
    CrudService::new(
        VersionedRepository::new(InMemoryDocumentStore::new()),
        PersonMapper,
    )
    .with_retry_policy(RetryPolicy::indefinite())
}

fn person(name: &str) -> PersonDto {
    PersonDto {
        name: Some(name.to_string()),
        city: Some("Lisbon".to_string()),
        ..PersonDto::default()
    }
}

fn id_of(dto: &PersonDto) -> RecordId {
    RecordId::from(dto.id.clone().unwrap())
}

#[tokio::test]
async fn stale_update_is_reapplied_on_latest_version() {
    let svc = memory_service();
    let created = svc.save(&person("a")).await.unwrap();
    assert_eq!(created.version, Some(1));
    let id = id_of(&created);

    let second = svc
        .update(
            &id,
            &PersonDto {
                id: created.id.clone(),
                version: Some(1),
                ..person("b")
            },
        )
        .await
        .unwrap();
    assert_eq!(second.version, Some(2));
    assert_eq!(second.name.as_deref(), Some("b"));

    let third = svc
        .update(
            &id,
            &PersonDto {
                id: created.id.clone(),
                version: Some(1),
                ..person("c")
            },
        )
        .await
        .unwrap();
    assert_eq!(third.id, created.id);
    assert_eq!(third.version, Some(3));
    assert_eq!(third.name.as_deref(), Some("c"));
}

#[tokio::test]
async fn missing_records_fail_without_retry() {
    let store = Arc::new(InterferingStore::new());
    let svc = CrudService::new(VersionedRepository::from_shared(Arc::clone(&store)), PersonMapper)
        .with_retry_policy(RetryPolicy::indefinite());
    let ghost = RecordId::from("nonexistent");

    assert!(matches!(svc.get(&ghost).await, Err(CrudError::NotFound(_))));
    assert!(matches!(
        svc.update(&ghost, &person("x")).await,
        Err(CrudError::NotFound(_))
    ));
    assert!(matches!(
        svc.patch(&ghost, &person("x")).await,
        Err(CrudError::NotFound(_))
    ));
    assert!(matches!(svc.delete(&ghost).await, Err(CrudError::NotFound(_))));
    assert_eq!(store.conditional_writes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn concurrent_bump_is_absorbed_by_retry() {
    let store = Arc::new(InterferingStore::new());
    let svc = CrudService::new(VersionedRepository::from_shared(Arc::clone(&store)), PersonMapper)
        .with_retry_policy(RetryPolicy::indefinite());

    let created = svc.save(&person("ann")).await.unwrap();
    let id = id_of(&created);

    store.armed.store(true, Ordering::SeqCst);
    let updated = svc.update(&id, &person("bea")).await.unwrap();
    assert_eq!(updated.version, Some(3));
    assert_eq!(updated.name.as_deref(), Some("bea"));
    assert_eq!(store.conditional_writes.load(Ordering::SeqCst), 2);

    store.armed.store(true, Ordering::SeqCst);
    let patched = svc
        .patch(
            &id,
            &PersonDto {
                name: Some("cat".to_string()),
                ..PersonDto::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(patched.version, Some(5));
    assert_eq!(patched.name.as_deref(), Some("cat"));
    assert_eq!(patched.city.as_deref(), Some("rival"));

    store.armed.store(true, Ordering::SeqCst);
    let deleted = svc.delete(&id).await.unwrap();
    assert_eq!(deleted.version, Some(7));
    assert!(deleted.archived);
}

#[tokio::test]
async fn patch_leaves_other_fields_alone() {
    let svc = memory_service();
    let created = svc.save(&person("dora")).await.unwrap();

    let patched = svc
        .patch(
            &id_of(&created),
            &PersonDto {
                city: Some("Porto".to_string()),
                ..PersonDto::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(patched.name.as_deref(), Some("dora"));
    assert_eq!(patched.city.as_deref(), Some("Porto"));
    assert_eq!(patched.version, Some(2));
}

#[tokio::test]
async fn delete_is_soft_and_bumps_version() {
    let svc = memory_service();
    let created = svc.save(&person("eve")).await.unwrap();
    let id = id_of(&created);

    let deleted = svc.delete(&id).await.unwrap();
    assert!(deleted.archived);
    assert_eq!(deleted.version, Some(2));

    let fetched = svc.get(&id).await.unwrap();
    assert!(fetched.archived);
    assert_eq!(fetched.name.as_deref(), Some("eve"));
}

#[tokio::test]
async fn pages_follow_last_update_order() {
    let svc = memory_service();
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

    // Inserted newest-first so insertion order and update order disagree.
    for n in 0..25i64 {
        svc.repository()
            .persist(Person {
                meta: RecordMeta {
                    date_updated: Some(base + ChronoDuration::minutes(100 - n)),
                    ..RecordMeta::new()
                },
                name: format!("p{n}"),
                city: "Faro".to_string(),
            })
            .await
            .unwrap();
    }

    let first = svc.get_by_page(0, 10).await.unwrap();
    assert_eq!(first.content.len(), 10);
    assert!(first.has_next_page);
    assert_eq!(first.content[0].name.as_deref(), Some("p24"));

    let last = svc.get_by_page(2, 10).await.unwrap();
    assert_eq!(last.content.len(), 5);
    assert!(!last.has_next_page);
    assert_eq!(last.content[4].name.as_deref(), Some("p0"));
}

#[tokio::test]
async fn bounded_retry_surfaces_exhaustion() {
    struct AlwaysConflicting(InMemoryDocumentStore<Person>);

    #[async_trait]
    impl DocumentStore<Person> for AlwaysConflicting {
        async fn find_by_id(&self, id: &RecordId) -> crudbase::Result<Option<Person>> {
            self.0.find_by_id(id).await
        }

        async fn find_page(&self, request: PageRequest) -> crudbase::Result<StorePage<Person>> {
            self.0.find_page(request).await
        }

        async fn insert(&self, record: Person) -> crudbase::Result<Person> {
            self.0.insert(record).await
        }

        async fn replace_if_version(
            &self,
            _record: Person,
            expected: Option<u64>,
        ) -> crudbase::Result<WriteOutcome<Person>> {
            Ok(WriteOutcome::Conflict {
                actual: expected.map(|v| v + 1),
            })
        }
    }

    let svc = CrudService::new(
        VersionedRepository::new(AlwaysConflicting(InMemoryDocumentStore::new())),
        PersonMapper,
    )
    .with_retry_policy(RetryPolicy::with_backoff(
        Duration::from_millis(1),
        0.2,
        RetryLimit::AtMost(3),
    ));

    let created = svc.save(&person("fay")).await.unwrap();
    match svc.update(&id_of(&created), &person("gil")).await {
        Err(CrudError::ConflictExhausted {
            operation,
            attempts,
            ..
        }) => {
            assert_eq!(operation, "update");
            assert_eq!(attempts, 4);
        }
        other => panic!("expected exhausted retries, got {other:?}"),
    }
}

/// Patches every field present in the payload, identity included.
struct VerbatimPatchMapper;

impl RecordMapper<PersonDto, Person> for VerbatimPatchMapper {
    fn map_to_external(&self, person: &Person) -> crudbase::Result<PersonDto> {
        PersonMapper.map_to_external(person)
    }

    fn map_to_stored(&self, dto: &PersonDto) -> crudbase::Result<Person> {
        PersonMapper.map_to_stored(dto)
    }

    fn patch_stored_from_external(
        &self,
        person: &mut Person,
        dto: &PersonDto,
    ) -> crudbase::Result<()> {
        if let Some(id) = &dto.id {
            person.meta.id = Some(RecordId::from(id.as_str()));
        }
        if dto.version.is_some() {
            person.meta.version = dto.version;
        }
        PersonMapper.patch_stored_from_external(person, dto)
    }
}

#[tokio::test]
async fn stale_patch_is_reapplied_on_latest_version() {
    let svc = CrudService::new(
        VersionedRepository::new(InMemoryDocumentStore::new()),
        VerbatimPatchMapper,
    )
    .with_retry_policy(RetryPolicy::bounded(3));

    let created = svc.save(&person("a")).await.unwrap();
    let id = id_of(&created);
    let second = svc.update(&id, &person("b")).await.unwrap();
    assert_eq!(second.version, Some(2));

    let patched = svc
        .patch(
            &id,
            &PersonDto {
                id: created.id.clone(),
                version: Some(1),
                name: Some("c".to_string()),
                ..PersonDto::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(patched.id, created.id);
    assert_eq!(patched.version, Some(3));
    assert_eq!(patched.name.as_deref(), Some("c"));
    assert_eq!(patched.city.as_deref(), Some("Lisbon"));
}
