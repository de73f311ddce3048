// ==========================================
// 合并历史 / 物理删除 / 酒批间转移测试
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

#[cfg(test)]
mod merge_history_test {
    use press_ledger::api::ApiError;
    use press_ledger::domain::types::{BatchStatus, VesselStatus};
    use press_ledger::domain::vessel::VesselAssignment;

    use crate::test_helpers::{
        assert_invariants, date, entry, setup_env, LotBuilder, TestEnv, ACTOR, EPS,
    };

    /// T01 上建一个 200 L 的酒批（批次 LX），返回 (压榨ID, 酒批ID)
    fn seed_active_batch(
        env: &TestEnv,
        lot_id: &str,
        vessel_id: &str,
        volume_l: f64,
    ) -> (String, String) {
        let run = env.press(date(2024, 3, 14), &[(lot_id, 100.0)]);
        let outcome = env
            .state
            .press_run_api
            .complete_press_run(
                &run.press_run_id,
                volume_l,
                &[VesselAssignment::lossless(vessel_id, volume_l)],
                date(2024, 3, 14),
                ACTOR,
            )
            .unwrap();
        (run.press_run_id, outcome.batches[0].batch_id.clone())
    }

    #[test]
    fn test_hard_delete_keeps_history_with_null_reference() {
        let env = setup_env();
        env.seed_lot(LotBuilder::new("LX", 1000.0));
        env.seed_lot(LotBuilder::new("L1", 1000.0));
        env.seed_vessel("T01", 1000.0, VesselStatus::Available);
        let (origin_run, batch_id) = seed_active_batch(&env, "LX", "T01", 200.0);

        let merge_run = env.press(date(2024, 3, 15), &[("L1", 150.0)]);
        env.state
            .press_run_api
            .complete_press_run(
                &merge_run.press_run_id,
                100.0,
                &[VesselAssignment::new("T01", 100.0, 2.0)],
                date(2024, 3, 15),
                ACTOR,
            )
            .unwrap();

        let detached = env
            .state
            .press_run_api
            .hard_delete_press_run(&merge_run.press_run_id, ACTOR)
            .unwrap();
        assert_eq!(detached, 1);

        let history = env.state.batch_api.merge_history(&batch_id).unwrap();
        assert_eq!(history.len(), 1);
        assert!(history[0].source_press_run_id.is_none());
        assert!((history[0].volume_added_l - 98.0).abs() < EPS);
        assert!((history[0].transfer_loss_l - 2.0).abs() < EPS);
        assert!(history[0].notes.is_some());

        // 删除来源压榨后，酒批与成分不受影响
        env.state
            .press_run_api
            .hard_delete_press_run(&origin_run, ACTOR)
            .unwrap();
        let batch = env.state.batch_api.get_batch(&batch_id).unwrap();
        assert!(batch.origin_press_run_id.is_none());
        assert_invariants(
            &env.state.batch_api.composition(&batch_id).unwrap(),
            batch.current_volume_l,
        );

        let err = env
            .state
            .press_run_api
            .get_press_run(&origin_run)
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
        assert_eq!(env.count("press_load"), 0);
    }

    #[test]
    fn test_transfer_merges_source_proportions_into_target() {
        let env = setup_env();
        env.seed_lot(LotBuilder::new("LA", 1000.0));
        env.seed_lot(LotBuilder::new("LB", 1000.0).variety("dabinett", "Dabinett"));
        env.seed_vessel("T01", 1000.0, VesselStatus::Available);
        env.seed_vessel("T02", 1000.0, VesselStatus::Available);
        let (_, source) = seed_active_batch(&env, "LA", "T01", 300.0);
        let (_, target) = seed_active_batch(&env, "LB", "T02", 100.0);

        let outcome = env
            .state
            .batch_api
            .transfer_between_batches(&source, &target, 150.0, 5.0, ACTOR)
            .unwrap();
        assert!(!outcome.source_archived);

        let source_batch = env.state.batch_api.get_batch(&source).unwrap();
        assert!((source_batch.current_volume_l - 150.0).abs() < EPS);
        let source_comp = env.state.batch_api.composition(&source).unwrap();
        assert_invariants(&source_comp, 150.0);
        // 来源重量按取出比例减半
        assert!((entry(&source_comp, "LA").input_weight_kg - 50.0).abs() < EPS);

        let target_batch = env.state.batch_api.get_batch(&target).unwrap();
        assert!((target_batch.current_volume_l - 245.0).abs() < EPS);
        let target_comp = env.state.batch_api.composition(&target).unwrap();
        assert_invariants(&target_comp, 245.0);
        assert!((entry(&target_comp, "LA").juice_volume_l - 145.0).abs() < EPS);
        assert!((entry(&target_comp, "LA").input_weight_kg - 50.0).abs() < EPS);

        let history = env.state.batch_api.merge_history(&target).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].source_batch_id.as_deref(), Some(source.as_str()));
        assert!((history[0].volume_before_l - 100.0).abs() < EPS);
        assert!((history[0].volume_after_l - 245.0).abs() < EPS);
    }

    #[test]
    fn test_drained_source_frees_vessel_and_name_suffix_applies() {
        let env = setup_env();
        env.seed_lot(LotBuilder::new("LA", 1000.0));
        env.seed_lot(LotBuilder::new("LB", 1000.0).variety("dabinett", "Dabinett"));
        env.seed_vessel("T01", 1000.0, VesselStatus::Available);
        env.seed_vessel("T02", 1000.0, VesselStatus::Available);
        let (_, source) = seed_active_batch(&env, "LA", "T01", 200.0);
        let (_, target) = seed_active_batch(&env, "LB", "T02", 100.0);
        let first_name = env.state.batch_api.get_batch(&source).unwrap().name;

        let outcome = env
            .state
            .batch_api
            .transfer_between_batches(&source, &target, 200.0, 0.0, ACTOR)
            .unwrap();
        assert!(outcome.source_archived);

        let archived = env.state.batch_api.get_batch(&source).unwrap();
        assert_eq!(archived.status, BatchStatus::Archived);
        assert!(archived.vessel_id.is_none());
        assert_eq!(env.vessel("T01").status, VesselStatus::Available);

        // T01 空出后同一天同一品种再建酒批：名称追加 _2
        let (_, again) = seed_active_batch(&env, "LA", "T01", 50.0);
        let name = env.state.batch_api.get_batch(&again).unwrap().name;
        assert_eq!(name, format!("{}_2", first_name));

        let err = env
            .state
            .batch_api
            .transfer_between_batches(&source, &target, 10.0, 0.0, ACTOR)
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidState(_)));
    }

    #[test]
    fn test_transfer_capacity_and_input_checks() {
        let env = setup_env();
        env.seed_lot(LotBuilder::new("LA", 1000.0));
        env.seed_lot(LotBuilder::new("LB", 1000.0));
        env.seed_vessel("T01", 1000.0, VesselStatus::Available);
        env.seed_vessel("T02", 150.0, VesselStatus::Available);
        let (_, source) = seed_active_batch(&env, "LA", "T01", 300.0);
        let (_, target) = seed_active_batch(&env, "LB", "T02", 100.0);
        let api = &env.state.batch_api;

        let err = api.transfer_between_batches(&source, &target, 60.0, 0.0, ACTOR).unwrap_err();
        assert!(matches!(err, ApiError::InvalidState(_)));

        let err = api.transfer_between_batches(&source, &target, 10.0, 10.0, ACTOR).unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));

        let err = api.transfer_between_batches(&source, "missing", 10.0, 0.0, ACTOR).unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        // 失败的转移不留下任何历史
        assert_eq!(env.count("merge_history"), 0);
    }
}
