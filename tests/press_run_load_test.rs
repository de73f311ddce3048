// ==========================================
// 压榨批次上料测试
// ==========================================
// 职责: 验证上料序号、重量合计、前置条件与并发追加
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

#[cfg(test)]
mod press_run_load_test {
    use press_ledger::api::ApiError;
    use press_ledger::domain::purchase::LotDepletion;
    use press_ledger::domain::types::PressRunStatus;
    use std::sync::Arc;
    use std::thread;

    use crate::test_helpers::{date, setup_env, LotBuilder, ACTOR};

    #[test]
    fn test_sequences_stay_consecutive_after_deletes() {
        let env = setup_env();
        env.seed_lot(LotBuilder::new("L1", 2000.0));
        let api = &env.state.press_run_api;
        let run = api.create_press_run(date(2024, 3, 15), None, ACTOR).unwrap();

        let ids: Vec<String> = (1..=5)
            .map(|i| {
                api.add_load(&run.press_run_id, "L1", 100.0 * i as f64, ACTOR)
                    .unwrap()
                    .load_id
            })
            .collect();

        api.delete_load(&ids[0], ACTOR).unwrap();
        api.delete_load(&ids[3], ACTOR).unwrap();

        let loads = api.list_loads(&run.press_run_id).unwrap();
        let seqs: Vec<i32> = loads.iter().map(|l| l.sequence).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
        let order: Vec<&str> = loads.iter().map(|l| l.load_id.as_str()).collect();
        assert_eq!(order, vec![ids[1].as_str(), ids[2].as_str(), ids[4].as_str()]);

        // 删除后新增的上料接在末尾
        let next = api.add_load(&run.press_run_id, "L1", 50.0, ACTOR).unwrap();
        assert_eq!(next.sequence, 4);

        let run = api.get_press_run(&run.press_run_id).unwrap();
        assert!((run.total_input_weight_kg - (200.0 + 300.0 + 500.0 + 50.0)).abs() < 1e-9);
    }

    #[test]
    fn test_depleted_lot_rejected_with_conflict() {
        let env = setup_env();
        env.seed_lot(LotBuilder::new("L1", 500.0));
        let api = &env.state.press_run_api;
        let run = api.create_press_run(date(2024, 3, 15), None, ACTOR).unwrap();

        env.state
            .purchase_lot_repo
            .mark_depleted(&LotDepletion {
                lot_id: "L1".to_string(),
                depleted_at: chrono::Local::now().naive_local(),
                depleted_by: ACTOR.to_string(),
                press_run_id: run.press_run_id.clone(),
            })
            .unwrap();

        let err = api.add_load(&run.press_run_id, "L1", 10.0, ACTOR).unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)), "got {:?}", err);
    }

    #[test]
    fn test_soft_deleted_lot_is_not_found() {
        let env = setup_env();
        env.seed_lot(LotBuilder::new("L1", 500.0));
        env.state.purchase_lot_repo.soft_delete("L1").unwrap();
        let api = &env.state.press_run_api;
        let run = api.create_press_run(date(2024, 3, 15), None, ACTOR).unwrap();

        let err = api.add_load(&run.press_run_id, "L1", 10.0, ACTOR).unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[test]
    fn test_loads_frozen_after_cancel() {
        let env = setup_env();
        env.seed_lot(LotBuilder::new("L1", 500.0));
        let run = env.press(date(2024, 3, 15), &[("L1", 100.0)]);
        let api = &env.state.press_run_api;
        let load_id = api.list_loads(&run.press_run_id).unwrap()[0].load_id.clone();

        let cancelled = api.cancel_press_run(&run.press_run_id, ACTOR).unwrap();
        assert_eq!(cancelled.status, PressRunStatus::Cancelled);

        assert!(matches!(
            api.update_load(&load_id, "L1", 120.0, ACTOR).unwrap_err(),
            ApiError::InvalidState(_)
        ));
        assert!(matches!(
            api.delete_load(&load_id, ACTOR).unwrap_err(),
            ApiError::InvalidState(_)
        ));
        assert_eq!(env.lot("L1").allocated_weight_kg, 0.0);
    }

    #[test]
    fn test_concurrent_adds_get_unique_sequences() {
        let env = setup_env();
        env.seed_lot(LotBuilder::new("L1", 10_000.0));
        let run = env.press(date(2024, 3, 15), &[]);

        // 每个线程使用独立连接，写锁由 BEGIN IMMEDIATE 串行化
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let state = Arc::new(env.second_state());
                let run_id = run.press_run_id.clone();
                thread::spawn(move || {
                    for _ in 0..5 {
                        state
                            .press_run_api
                            .add_load(&run_id, "L1", 10.0, ACTOR)
                            .unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let loads = env.state.press_run_api.list_loads(&run.press_run_id).unwrap();
        let seqs: Vec<i32> = loads.iter().map(|l| l.sequence).collect();
        assert_eq!(seqs, (1..=20).collect::<Vec<i32>>());

        let run = env.state.press_run_api.get_press_run(&run.press_run_id).unwrap();
        assert!((run.total_input_weight_kg - 200.0).abs() < 1e-9);
    }
}
