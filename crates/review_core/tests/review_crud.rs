use review_core::db::open_db_in_memory;
use review_core::{
    InMemoryEmployeeDirectory, RepoError, Review, ReviewRepository, ReviewState,
    ReviewValidationError, SqliteEmployeeDirectory, SqliteReviewRepository,
};
use rusqlite::{params, Connection};
use std::rc::Rc;

fn setup() -> Connection {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO departments (id, name, location) VALUES (1, 'Payroll', 'Building A');",
        [],
    )
    .unwrap();
    for (id, name) in [(7_i64, "Lee"), (8, "Sasha")] {
        conn.execute(
            "INSERT INTO employees (id, name, job_title, department_id) VALUES (?1, ?2, 'Accountant', 1);",
            params![id, name],
        )
        .unwrap();
    }
    conn
}

fn repo(conn: &Connection) -> SqliteReviewRepository<'_, SqliteEmployeeDirectory<'_>> {
    let mut repo =
        SqliteReviewRepository::try_new(conn, SqliteEmployeeDirectory::new(conn)).unwrap();
    repo.create_table().unwrap();
    repo
}

#[test]
fn create_rejects_year_before_2000() {
    let conn = setup();
    let mut repo = repo(&conn);

    for year in [1999, 0, -5] {
        let err = repo.create(year, "too early", 7).err().unwrap();
        assert!(matches!(
            err,
            RepoError::Validation(ReviewValidationError::YearOutOfRange { .. })
        ));
    }
    assert_eq!(repo.count().unwrap(), 0);
}

#[test]
fn build_rejects_empty_summary() {
    let conn = setup();
    let repo = repo(&conn);

    let err = repo.build(2021, "", 7).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ReviewValidationError::EmptySummary)
    ));
}

#[test]
fn build_rejects_unknown_employee() {
    let conn = setup();
    let repo = repo(&conn);

    let err = repo.build(2021, "Solid performance", 42).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ReviewValidationError::UnknownEmployee(42))
    ));
    assert_eq!(err.to_string(), "invalid employee_id: 42");
}

#[test]
fn set_employee_id_validates_and_keeps_old_value_on_error() {
    let conn = setup();
    let repo = repo(&conn);
    let mut review = repo.build(2021, "Solid performance", 7).unwrap();

    repo.set_employee_id(&mut review, 8).unwrap();
    assert_eq!(review.employee_id(), 8);

    let err = repo.set_employee_id(&mut review, 99).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ReviewValidationError::UnknownEmployee(99))
    ));
    assert_eq!(review.employee_id(), 8);
}

#[test]
fn create_then_find_by_id_roundtrip() {
    let conn = setup();
    let mut repo = repo(&conn);

    let created = repo.create(2023, "Good work", 7).unwrap();
    let id = created.borrow().id().unwrap();

    repo.clear_cache();
    let loaded = repo.find_by_id(id).unwrap().unwrap();
    assert!(!Rc::ptr_eq(&created, &loaded));
    assert_eq!(*loaded.borrow(), *created.borrow());
    assert_eq!(loaded.borrow().year(), 2023);
    assert_eq!(loaded.borrow().summary(), "Good work");
    assert_eq!(loaded.borrow().employee_id(), 7);
}

#[test]
fn find_by_id_returns_same_object_for_same_id() {
    let conn = setup();
    let mut repo = repo(&conn);

    let created = repo.create(2022, "Improved", 7).unwrap();
    let id = created.borrow().id().unwrap();

    let first = repo.find_by_id(id).unwrap().unwrap();
    let second = repo.find_by_id(id).unwrap().unwrap();
    assert!(Rc::ptr_eq(&first, &second));
    assert!(Rc::ptr_eq(&first, &created));
    assert!(repo.find_by_id(id + 100).unwrap().is_none());
}

#[test]
fn save_twice_updates_instead_of_inserting() {
    let conn = setup();
    let mut repo = repo(&conn);

    let review = repo.build(2021, "Solid performance", 7).unwrap().into_shared();
    let id = repo.save(&review).unwrap();

    review.borrow_mut().set_summary("Outstanding").unwrap();
    let second_id = repo.save(&review).unwrap();

    assert_eq!(id, second_id);
    assert_eq!(repo.count().unwrap(), 1);

    let summary: String = conn
        .query_row("SELECT summary FROM reviews WHERE id = ?1;", [id], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(summary, "Outstanding");
}

#[test]
fn delete_removes_row_cache_entry_and_id() {
    let conn = setup();
    let mut repo = repo(&conn);

    let review = repo.create(2021, "Solid performance", 7).unwrap();
    let id = review.borrow().id().unwrap();

    repo.delete(&review).unwrap();

    assert_eq!(review.borrow().id(), None);
    assert_eq!(review.borrow().state(), ReviewState::New);
    assert!(repo.cached(id).is_none());
    assert!(repo.find_by_id(id).unwrap().is_none());

    let err = repo.delete(&review).unwrap_err();
    assert!(matches!(err, RepoError::NotPersisted));
}

#[test]
fn delete_of_missing_row_evicts_cache_but_keeps_id() {
    let conn = setup();
    let mut repo = repo(&conn);

    let review = repo.create(2021, "Solid performance", 7).unwrap();
    let id = review.borrow().id().unwrap();
    conn.execute("DELETE FROM reviews WHERE id = ?1;", [id])
        .unwrap();

    let err = repo.delete(&review).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(missing) if missing == id));
    assert_eq!(review.borrow().id(), Some(id));
    assert!(repo.cached(id).is_none());
    assert_eq!(repo.cache_len(), 0);
}

#[test]
fn insert_of_unchecked_review_rejects_unknown_employee() {
    let conn = setup();
    let mut repo = repo(&conn);

    let err = repo
        .insert(Review::new(2021, "dangling", 999).unwrap())
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ReviewValidationError::UnknownEmployee(999))
    ));
    assert_eq!(repo.count().unwrap(), 0);
    assert_eq!(repo.cache_len(), 0);
}

#[test]
fn save_of_deserialized_review_rejects_unknown_employee() {
    let conn = setup();
    let mut repo = repo(&conn);
    let stored = repo.create(2021, "Solid performance", 7).unwrap();
    let id = stored.borrow().id().unwrap();

    let edited: Review = serde_json::from_value(serde_json::json!({
        "id": id,
        "year": 2021,
        "summary": "Solid performance",
        "employee_id": 999
    }))
    .unwrap();

    let err = repo.save(&edited.into_shared()).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ReviewValidationError::UnknownEmployee(999))
    ));
    let employee_id: i64 = conn
        .query_row("SELECT employee_id FROM reviews WHERE id = ?1;", [id], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(employee_id, 7);
}

#[test]
fn create_table_then_get_all_is_empty() {
    let conn = setup();
    let mut repo = repo(&conn);

    assert!(repo.get_all().unwrap().is_empty());
}

#[test]
fn create_and_get_all_follow_insertion_order() {
    let conn = setup();
    let mut repo = repo(&conn);

    let first = repo.create(2021, "Solid performance", 7).unwrap();
    assert_eq!(first.borrow().id(), Some(1));
    assert_eq!(first.borrow().year(), 2021);

    let second = repo.create(2022, "Improved", 7).unwrap();
    let all = repo.get_all().unwrap();

    assert_eq!(all.len(), 2);
    assert!(Rc::ptr_eq(&all[0], &first));
    assert!(Rc::ptr_eq(&all[1], &second));
    assert_eq!(all[1].borrow().summary(), "Improved");
}

#[test]
fn drop_and_create_table_reset_identity_map() {
    let conn = setup();
    let mut repo = repo(&conn);

    let review = repo.create(2021, "Solid performance", 7).unwrap();
    let id = review.borrow().id().unwrap();
    assert_eq!(repo.cache_len(), 1);

    repo.drop_table().unwrap();
    assert_eq!(repo.cache_len(), 0);
    repo.drop_table().unwrap();

    repo.create_table().unwrap();
    repo.create_table().unwrap();
    assert!(repo.find_by_id(id).unwrap().is_none());
    assert!(repo.get_all().unwrap().is_empty());
}

#[test]
fn insert_rejects_persisted_review() {
    let conn = setup();
    let mut repo = repo(&conn);

    let stored = repo.create(2021, "Solid performance", 7).unwrap();
    let copy = stored.borrow().clone();

    let err = repo.insert(copy).err().unwrap();
    assert!(matches!(err, RepoError::AlreadyPersisted(1)));
    assert_eq!(repo.count().unwrap(), 1);
}

#[test]
fn update_requires_persisted_review_and_writes_all_fields() {
    let conn = setup();
    let mut repo = repo(&conn);

    let transient = Review::new(2021, "draft", 7).unwrap().into_shared();
    assert!(matches!(
        repo.update(&transient).unwrap_err(),
        RepoError::NotPersisted
    ));

    let review = repo.create(2021, "Solid performance", 7).unwrap();
    {
        let mut review = review.borrow_mut();
        review.set_year(2024).unwrap();
        repo.set_employee_id(&mut review, 8).unwrap();
    }
    repo.update(&review).unwrap();

    repo.clear_cache();
    let id = review.borrow().id().unwrap();
    let reloaded = repo.find_by_id(id).unwrap().unwrap();
    assert_eq!(reloaded.borrow().year(), 2024);
    assert_eq!(reloaded.borrow().employee_id(), 8);
    assert_eq!(reloaded.borrow().summary(), "Solid performance");
}

#[test]
fn update_of_deleted_row_reports_not_found() {
    let conn = setup();
    let mut repo = repo(&conn);

    let review = repo.create(2021, "Solid performance", 7).unwrap();
    conn.execute("DELETE FROM reviews;", []).unwrap();

    let err = repo.update(&review).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(1)));
}

#[test]
fn list_for_employee_filters_by_employee() {
    let conn = setup();
    let mut repo = repo(&conn);

    let lee_first = repo.create(2021, "Solid performance", 7).unwrap();
    repo.create(2021, "Needs mentoring", 8).unwrap();
    let lee_second = repo.create(2022, "Improved", 7).unwrap();

    let reviews = repo.list_for_employee(7).unwrap();
    assert_eq!(reviews.len(), 2);
    assert!(Rc::ptr_eq(&reviews[0], &lee_first));
    assert!(Rc::ptr_eq(&reviews[1], &lee_second));
    assert!(repo.list_for_employee(99).unwrap().is_empty());
}

#[test]
fn rows_written_outside_the_mapper_are_validated_on_load() {
    let conn = setup();
    let mut repo = repo(&conn);
    conn.execute(
        "INSERT INTO reviews (id, year, summary, employee_id) VALUES (5, 1995, 'legacy', 7);",
        [],
    )
    .unwrap();

    let err = repo.find_by_id(5).err().unwrap();
    assert!(matches!(
        err,
        RepoError::Validation(ReviewValidationError::YearOutOfRange { year: 1995 })
    ));
    assert_eq!(repo.cache_len(), 0);
}

#[test]
fn storage_errors_propagate_unchanged() {
    let conn = setup();
    // Directory accepts 500, but the employees table has no such row.
    let mut repo =
        SqliteReviewRepository::try_new(&conn, InMemoryEmployeeDirectory::new([500])).unwrap();
    repo.create_table().unwrap();

    let err = repo.create(2021, "Solid performance", 500).err().unwrap();
    assert!(matches!(err, RepoError::Db(_)));
    assert_eq!(repo.count().unwrap(), 0);
}

#[test]
fn operations_without_table_surface_db_error() {
    let conn = setup();
    let mut repo =
        SqliteReviewRepository::try_new(&conn, SqliteEmployeeDirectory::new(&conn)).unwrap();

    assert!(matches!(repo.get_all().unwrap_err(), RepoError::Db(_)));
}
