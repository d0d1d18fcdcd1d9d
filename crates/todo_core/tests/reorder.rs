use proptest::prelude::*;
use rusqlite::Connection;
use todo_core::db::open_db_in_memory;
use todo_core::{
    ErrorKind, MoveDirection, NewTodo, SqliteTodoRepository, TodoId, TodoService,
    TodoServiceError,
};

fn service(conn: &Connection) -> TodoService<SqliteTodoRepository<'_>> {
    TodoService::new(SqliteTodoRepository::try_new(conn).unwrap())
}

/// Creates `count` todos holding ranks `1..=count`; returns ids in rank order.
fn seed(service: &TodoService<SqliteTodoRepository<'_>>, count: usize) -> Vec<TodoId> {
    (1..=count)
        .map(|index| {
            service
                .create_todo(NewTodo::new(format!("todo {index}")))
                .unwrap()
                .id
        })
        .collect()
}

/// Active `(id, rank)` pairs in list order.
fn active_ranks(service: &TodoService<SqliteTodoRepository<'_>>) -> Vec<(TodoId, i64)> {
    service
        .list_active()
        .unwrap()
        .into_iter()
        .map(|todo| (todo.id, todo.display_order))
        .collect()
}

#[test]
fn moving_up_pushes_window_back_by_one() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let ids = seed(&service, 5);

    let outcome = service.move_todo(ids[4], 5, 2).unwrap();

    assert_eq!(outcome.shifted, 3);
    assert_eq!(outcome.window.unwrap().direction, MoveDirection::Up);
    assert_eq!(
        active_ranks(&service),
        vec![(ids[0], 1), (ids[4], 2), (ids[1], 3), (ids[2], 4), (ids[3], 5)]
    );
}

#[test]
fn moving_down_pulls_window_forward_by_one() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let ids = seed(&service, 5);

    let outcome = service.move_todo(ids[1], 2, 5).unwrap();

    assert_eq!(outcome.shifted, 3);
    assert_eq!(outcome.window.unwrap().direction, MoveDirection::Down);
    assert_eq!(
        active_ranks(&service),
        vec![(ids[0], 1), (ids[2], 2), (ids[3], 3), (ids[4], 4), (ids[1], 5)]
    );
}

#[test]
fn moving_to_same_rank_is_a_no_op() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let ids = seed(&service, 3);
    let before = service.list_active().unwrap();

    let outcome = service.move_todo(ids[1], 2, 2).unwrap();

    assert_eq!(outcome.window, None);
    assert_eq!(outcome.shifted, 0);
    assert_eq!(service.list_active().unwrap(), before);
}

#[test]
fn moving_adjacent_swaps_two_todos() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let ids = seed(&service, 3);

    service.move_todo(ids[2], 3, 2).unwrap();

    assert_eq!(
        active_ranks(&service),
        vec![(ids[0], 1), (ids[2], 2), (ids[1], 3)]
    );
}

#[test]
fn moving_missing_todo_is_not_found_and_writes_nothing() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    seed(&service, 3);
    let before = active_ranks(&service);

    let err = service.move_todo(999, 3, 1).unwrap_err();

    assert!(matches!(err, TodoServiceError::NotFound(999)));
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(active_ranks(&service), before);
}

#[test]
fn moving_trashed_todo_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let ids = seed(&service, 3);
    service.soft_delete_todo(ids[2]).unwrap();

    let err = service.move_todo(ids[2], 3, 1).unwrap_err();

    assert!(matches!(err, TodoServiceError::NotFound(id) if id == ids[2]));
    assert_eq!(active_ranks(&service), vec![(ids[0], 1), (ids[1], 2)]);
}

#[test]
fn moving_skips_trashed_peers_inside_window() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let ids = seed(&service, 4);
    service.soft_delete_todo(ids[1]).unwrap();

    service.move_todo(ids[3], 4, 1).unwrap();

    let trashed = service.get_todo(ids[1], true).unwrap().unwrap();
    assert_eq!(trashed.display_order, 2);
    assert_eq!(
        active_ranks(&service),
        vec![(ids[3], 1), (ids[0], 2), (ids[2], 4)]
    );
}

#[test]
fn non_positive_ranks_are_rejected_before_any_write() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let ids = seed(&service, 2);

    let err = service.move_todo(ids[0], 0, 2).unwrap_err();
    assert!(matches!(
        err,
        TodoServiceError::InvalidRank {
            field: "oldIndex",
            value: 0
        }
    ));
    let err = service.move_todo(ids[0], 1, -3).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(active_ranks(&service), vec![(ids[0], 1), (ids[1], 2)]);
}

#[test]
fn stale_old_rank_is_trusted_and_breaks_density() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let ids = seed(&service, 5);

    // ids[0] really sits at rank 1; the caller claims rank 3.
    service.move_todo(ids[0], 3, 5).unwrap();

    let audit = service.audit_active_order().unwrap();
    assert_eq!(audit.duplicates, vec![3]);
    assert_eq!(audit.gaps, vec![1]);
}

#[test]
fn store_failure_during_shift_rolls_back_target_write() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let ids = seed(&service, 5);
    let before = active_ranks(&service);

    conn.execute_batch(&format!(
        "CREATE TRIGGER fail_rank_shift
         BEFORE UPDATE OF display_order ON todos
         WHEN OLD.id = {}
         BEGIN
             SELECT RAISE(ABORT, 'simulated shift failure');
         END;",
        ids[2]
    ))
    .unwrap();

    let err = service.move_todo(ids[4], 5, 2).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Storage);
    assert!(err.to_string().contains("simulated shift failure"));
    assert_eq!(active_ranks(&service), before);
    assert!(conn.is_autocommit(), "transaction must be closed after rollback");
}

#[test]
fn audit_reports_dense_order_after_moves() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let ids = seed(&service, 6);

    service.move_todo(ids[5], 6, 1).unwrap();
    service.move_todo(ids[0], 2, 4).unwrap();
    service.move_todo(ids[3], 5, 5).unwrap();

    let audit = service.audit_active_order().unwrap();
    assert!(audit.is_dense(), "{audit:?}");
    assert_eq!(audit.len, 6);
}

fn rank_moves() -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
    (1usize..8).prop_flat_map(|len| {
        (
            Just(len),
            prop::collection::vec((1..=len, 1..=len), 0..12),
        )
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_accurate_moves_keep_ranks_dense_and_match_list_model((len, moves) in rank_moves()) {
        let conn = open_db_in_memory().unwrap();
        let service = service(&conn);
        let mut expected = seed(&service, len);

        for (from, to) in moves {
            let id = expected.remove(from - 1);
            expected.insert(to - 1, id);
            service.move_todo(id, from as i64, to as i64).unwrap();
        }

        let active = active_ranks(&service);
        let ranks = active.iter().map(|(_, rank)| *rank).collect::<Vec<_>>();
        let ids = active.iter().map(|(id, _)| *id).collect::<Vec<_>>();
        prop_assert_eq!(ranks, (1..=len as i64).collect::<Vec<_>>());
        prop_assert_eq!(ids, expected);
    }
}
