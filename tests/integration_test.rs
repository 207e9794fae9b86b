//! 集成測試

use std::sync::Arc;
use std::thread;

use chrono::NaiveDate;
use cm_mrp::*;
use proptest::prelude::*;
use rust_decimal::Decimal;

const ACTOR: &str = "planner";

fn due(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 11, day).unwrap()
}

fn receipt(material_id: &str, quantity: i64) -> Transaction {
    Transaction::new(
        material_id.to_string(),
        Decimal::from(quantity),
        TransactionType::Receipt,
        "receiving".to_string(),
    )
}

/// 場景：PCBA-100 每片需要 1 個 IC-MCU（SMT）與 2 個 FLUX（THT）
fn planning() -> PlanningSnapshot {
    PlanningSnapshot::new()
        .with_revision(
            BomRevision::new("REV-A".to_string(), "PCBA-100".to_string(), "A".to_string())
                .with_items(vec![
                    BomItem::new("IC-MCU".to_string(), Decimal::ONE)
                        .with_resource_type("SMT".to_string()),
                    BomItem::new("FLUX".to_string(), Decimal::from(2))
                        .with_resource_type("THT".to_string()),
                ]),
        )
        .with_order(
            Order::new(
                "SO-1".to_string(),
                "ACME".to_string(),
                Decimal::from(60),
                "REV-A".to_string(),
            )
            .with_due_date(due(10)),
        )
        .with_order(
            Order::new(
                "SO-2".to_string(),
                "GLOBEX".to_string(),
                Decimal::from(70),
                "REV-A".to_string(),
            )
            .with_due_date(due(20)),
        )
}

fn engine(config: PlanningConfig) -> ContractMrp {
    let store = Arc::new(InventoryStore::new());
    store.register_material(Material::new("IC-MCU".to_string(), UnitOfMeasure::Each));
    store.register_material(Material::new("FLUX".to_string(), UnitOfMeasure::Gram));

    let planning = Arc::new(planning());
    let engine = ContractMrp::new(store, planning.clone(), planning, config).unwrap();
    engine.post(receipt("IC-MCU", 100)).unwrap();
    engine.post(receipt("FLUX", 1000)).unwrap();
    engine
}

fn bom_item(engine: &ContractMrp, order_id: &str, material_id: &str) -> uuid::Uuid {
    engine
        .order_bom(order_id)
        .unwrap()
        .items
        .iter()
        .find(|item| item.material_id == material_id)
        .unwrap()
        .id
}

fn allocate(engine: &ContractMrp, order_id: &str, material_id: &str, quantity: i64) -> uuid::Uuid {
    engine
        .allocate(Allocation::new(
            order_id.to_string(),
            material_id.to_string(),
            Decimal::from(quantity),
            ACTOR.to_string(),
        ))
        .unwrap()
}

#[test]
fn test_scenario_a_due_date_priority() {
    let engine = engine(PlanningConfig::new());

    let shortages = engine.shortages();
    assert_eq!(shortages.len(), 1);
    assert_eq!(shortages[0].material_id, "IC-MCU");
    assert_eq!(shortages[0].shortage, Decimal::from(30));

    let buildability = engine.order_buildability();
    assert_eq!(buildability[0].order_id, "SO-1");
    assert_eq!(buildability[0].status, BuildStatus::CanBuild);

    let so2 = &buildability[1];
    let mcu = so2.materials.iter().find(|m| m.material_id == "IC-MCU").unwrap();
    assert_eq!(mcu.shortage, Decimal::from(30));
    assert_eq!(mcu.global_shortage, Decimal::from(30));
    assert_eq!(so2.status, BuildStatus::Partial);
    assert_eq!(so2.materials_ready + so2.materials_short, so2.materials_total);
}

#[test]
fn test_scenario_b_return_with_counted_consumed_waste() {
    let engine = engine(PlanningConfig::new());
    let id = allocate(&engine, "SO-1", "IC-MCU", 10);

    assert_eq!(engine.pick("SO-1", None).unwrap().picked, 1);
    assert_eq!(engine.issue("SO-1", None, ACTOR).unwrap().issued, 1);

    let issued = engine.snapshot("IC-MCU").unwrap();
    assert_eq!(issued.on_hand, Decimal::from(100));
    assert_eq!(issued.allocated, Decimal::from(10));
    assert_eq!(issued.available, Decimal::from(90));

    let summary = engine
        .return_order(
            "SO-1",
            &[ReturnInput::new(
                id,
                Decimal::from(6),
                Decimal::from(3),
                Decimal::ONE,
                ReturnAction::Return,
            )],
            ACTOR,
        )
        .unwrap();

    assert_eq!(summary.returned, 1);
    assert_eq!(summary.total_materials_returned, Decimal::from(6));
    assert_eq!(summary.total_consumed, Decimal::from(3));
    assert_eq!(summary.total_waste, Decimal::ONE);
    assert_eq!(summary.total_variance, Decimal::ZERO);
    assert!(summary.warnings.is_empty());

    let alloc = engine.store().allocation(id).unwrap();
    assert_eq!(alloc.status, AllocationStatus::Returned);
    assert_eq!(alloc.quantity, Decimal::from(10));

    let types: Vec<TransactionType> = engine
        .store()
        .transactions("IC-MCU")
        .unwrap()
        .iter()
        .map(|tx| tx.transaction_type)
        .collect();
    assert_eq!(
        types,
        vec![
            TransactionType::Receipt,
            TransactionType::IssueToWo,
            TransactionType::Consumption,
            TransactionType::Scrap,
            TransactionType::ReturnFromWo,
        ]
    );

    let after = engine.snapshot("IC-MCU").unwrap();
    assert_eq!(after.on_hand, Decimal::from(96));
    assert_eq!(after.allocated, Decimal::ZERO);
    assert_eq!(after.available, issued.available + Decimal::from(6));
}

#[test]
fn test_return_variance_is_reported() {
    let engine = engine(PlanningConfig::new());
    let id = allocate(&engine, "SO-1", "IC-MCU", 10);
    engine.pick("SO-1", None).unwrap();
    engine.issue("SO-1", None, ACTOR).unwrap();

    let summary = engine
        .return_order(
            "SO-1",
            &[ReturnInput::new(
                id,
                Decimal::from(5),
                Decimal::from(3),
                Decimal::ZERO,
                ReturnAction::FloorStock,
            )],
            ACTOR,
        )
        .unwrap();

    assert_eq!(summary.total_variance, Decimal::from(2));
    assert_eq!(summary.total_materials_returned, Decimal::ZERO);
    assert_eq!(summary.warnings.len(), 1);
    assert!(summary.has_variance());

    let alloc = engine.store().allocation(id).unwrap();
    assert_eq!(alloc.status, AllocationStatus::FloorStock);
    let outcome = alloc.return_outcome.unwrap();
    assert_eq!(
        outcome.counted_quantity + outcome.consumed_quantity + outcome.waste_quantity + outcome.variance,
        Decimal::from(10)
    );

    // 場內存量不回寫分類帳，只有耗用減少現有庫存；點收量與差異留在工單保管
    let snap = engine.snapshot("IC-MCU").unwrap();
    assert_eq!(snap.on_hand, Decimal::from(97));
    assert_eq!(snap.allocated, Decimal::ZERO);
    assert_eq!(snap.in_custody, Decimal::from(7));
    assert_eq!(snap.available, Decimal::from(90));
}

#[test]
fn test_return_and_floor_stock_differ_in_available() {
    let close = |action: ReturnAction| {
        let engine = engine(PlanningConfig::new());
        let id = allocate(&engine, "SO-1", "IC-MCU", 10);
        engine.pick("SO-1", None).unwrap();
        engine.issue("SO-1", None, ACTOR).unwrap();
        engine
            .return_order(
                "SO-1",
                &[ReturnInput::new(
                    id,
                    Decimal::from(6),
                    Decimal::from(3),
                    Decimal::ONE,
                    action,
                )],
                ACTOR,
            )
            .unwrap();
        engine.snapshot("IC-MCU").unwrap()
    };

    let returned = close(ReturnAction::Return);
    let floor = close(ReturnAction::FloorStock);

    assert_eq!(returned.on_hand, floor.on_hand);
    assert_eq!(returned.available, Decimal::from(96));
    assert_eq!(floor.available, Decimal::from(90));
    assert_eq!(floor.in_custody, Decimal::from(6));

    // 現場庫存不可再被分配
    let engine = engine(PlanningConfig::new());
    let id = allocate(&engine, "SO-1", "IC-MCU", 10);
    engine.pick("SO-1", None).unwrap();
    engine.issue("SO-1", None, ACTOR).unwrap();
    engine
        .return_order(
            "SO-1",
            &[ReturnInput::new(id, Decimal::from(6), Decimal::from(3), Decimal::ONE, ReturnAction::FloorStock)],
            ACTOR,
        )
        .unwrap();
    let err = engine
        .allocate(Allocation::new(
            "SO-2".to_string(),
            "IC-MCU".to_string(),
            Decimal::from(91),
            ACTOR.to_string(),
        ))
        .unwrap_err();
    assert!(matches!(err, MrpError::InsufficientStock { .. }));
}

#[test]
fn test_scenario_c_issue_requires_pick() {
    let engine = engine(PlanningConfig::new());
    let id = allocate(&engine, "SO-1", "IC-MCU", 10);

    let result = engine.issue("SO-1", Some(&[id][..]), ACTOR).unwrap();
    assert_eq!(result.issued, 0);
    assert_eq!(result.failed.len(), 1);
    assert!(matches!(
        result.failed[0].cause,
        MrpError::InvalidTransition {
            from: AllocationStatus::Active,
            to: AllocationStatus::Issued,
            ..
        }
    ));

    // 重複揀料同樣是非法轉換
    engine.pick("SO-1", Some(&[id][..])).unwrap();
    let again = engine.pick("SO-1", Some(&[id][..])).unwrap();
    assert_eq!(again.picked, 0);
    assert!(matches!(again.failed[0].cause, MrpError::InvalidTransition { .. }));
}

#[test]
fn test_scenario_d_covered_by_on_order() {
    let store = Arc::new(InventoryStore::new());
    store.register_material(Material::new("IC-MCU".to_string(), UnitOfMeasure::Each));
    store.register_material(Material::new("FLUX".to_string(), UnitOfMeasure::Gram));
    store.register_purchase_line(PurchaseOrderLine::new(
        "PO-1".to_string(),
        "IC-MCU".to_string(),
        Decimal::from(40),
    ));

    let planning = Arc::new(
        PlanningSnapshot::new()
            .with_revision(
                BomRevision::new("REV-A".to_string(), "PCBA-100".to_string(), "A".to_string())
                    .with_items(vec![BomItem::new("IC-MCU".to_string(), Decimal::ONE)]),
            )
            .with_order(Order::new(
                "SO-1".to_string(),
                "ACME".to_string(),
                Decimal::from(50),
                "REV-A".to_string(),
            )),
    );
    let engine = ContractMrp::new(store, planning.clone(), planning, PlanningConfig::new()).unwrap();
    engine.post(receipt("IC-MCU", 20)).unwrap();

    let report = engine.requirements();
    let line = report.line("IC-MCU").unwrap();
    assert_eq!(line.total_required, Decimal::from(50));
    assert_eq!(line.available, Decimal::from(20));
    assert_eq!(line.on_order, Decimal::from(40));
    assert_eq!(line.net_requirement, Decimal::ZERO);
    assert!(engine.shortages().is_empty());
}

#[test]
fn test_auto_consume_by_resource_type() {
    let engine = engine(PlanningConfig::new());
    let flux = engine
        .allocate(
            Allocation::new(
                "SO-1".to_string(),
                "FLUX".to_string(),
                Decimal::from(120),
                ACTOR.to_string(),
            )
            .with_bom_item(bom_item(&engine, "SO-1", "FLUX"), None),
        )
        .unwrap();
    allocate(&engine, "SO-1", "IC-MCU", 60);
    assert_eq!(
        engine.store().allocation(flux).unwrap().resource_type.as_deref(),
        Some("THT")
    );

    engine.pick("SO-1", None).unwrap();
    engine.issue("SO-1", None, ACTOR).unwrap();

    assert_eq!(engine.auto_consume("SO-1", "SMT", ACTOR).unwrap().auto_consumed, 0);
    assert_eq!(engine.auto_consume("SO-1", "THT", ACTOR).unwrap().auto_consumed, 1);

    assert_eq!(
        engine.store().allocation(flux).unwrap().status,
        AllocationStatus::Consumed
    );
    let snap = engine.snapshot("FLUX").unwrap();
    assert_eq!(snap.on_hand, Decimal::from(880));
    assert_eq!(snap.allocated, Decimal::ZERO);
}

#[test]
fn test_auto_consume_follows_bom_line_tag() {
    let engine = engine(PlanningConfig::new());
    // 呼叫端標記與 BOM 行不一致時以 BOM 行為準
    let flux = engine
        .allocate(
            Allocation::new(
                "SO-1".to_string(),
                "FLUX".to_string(),
                Decimal::from(120),
                ACTOR.to_string(),
            )
            .with_bom_item(bom_item(&engine, "SO-1", "FLUX"), Some("SMT".to_string())),
        )
        .unwrap();
    engine.pick("SO-1", None).unwrap();
    engine.issue("SO-1", None, ACTOR).unwrap();

    assert_eq!(engine.auto_consume("SO-1", "SMT", ACTOR).unwrap().auto_consumed, 0);
    assert_eq!(engine.auto_consume("SO-1", "THT", ACTOR).unwrap().auto_consumed, 1);
    assert_eq!(
        engine.store().allocation(flux).unwrap().status,
        AllocationStatus::Consumed
    );

    // 訂單 BOM 中不存在的行
    let unknown = engine
        .allocate(
            Allocation::new(
                "SO-1".to_string(),
                "IC-MCU".to_string(),
                Decimal::from(5),
                ACTOR.to_string(),
            )
            .with_bom_item(uuid::Uuid::nil(), Some("THT".to_string())),
        )
        .unwrap_err();
    assert!(matches!(unknown, MrpError::NotFound { entity: "BOM 行", .. }));

    // BOM 行與分配物料不一致
    let mismatch = engine
        .allocate(
            Allocation::new(
                "SO-1".to_string(),
                "IC-MCU".to_string(),
                Decimal::from(5),
                ACTOR.to_string(),
            )
            .with_bom_item(bom_item(&engine, "SO-1", "FLUX"), None),
        )
        .unwrap_err();
    assert!(matches!(mismatch, MrpError::NotFound { entity: "BOM 行", .. }));
}

#[test]
fn test_unknown_order_is_not_found() {
    let engine = engine(PlanningConfig::new());

    assert!(matches!(
        engine.pick("SO-404", None),
        Err(MrpError::NotFound { .. })
    ));
    assert!(matches!(
        engine.return_order("SO-404", &[], ACTOR),
        Err(MrpError::NotFound { .. })
    ));
}

#[test]
fn test_cancel_releases_and_reverse_compensates() {
    let engine = engine(PlanningConfig::new());
    let id = allocate(&engine, "SO-2", "IC-MCU", 100);

    // 可用量為零，無法再分配
    let err = engine
        .allocate(Allocation::new(
            "SO-1".to_string(),
            "IC-MCU".to_string(),
            Decimal::ONE,
            ACTOR.to_string(),
        ))
        .unwrap_err();
    assert!(matches!(err, MrpError::InsufficientStock { .. }));

    engine.cancel(id).unwrap();
    assert_eq!(engine.snapshot("IC-MCU").unwrap().available, Decimal::from(100));
    assert!(engine.cancel(id).is_err());

    let scrap = engine
        .post(Transaction::new(
            "IC-MCU".to_string(),
            Decimal::from(-5),
            TransactionType::Scrap,
            ACTOR.to_string(),
        ))
        .unwrap();
    engine.reverse("IC-MCU", scrap, ACTOR).unwrap();
    assert_eq!(engine.snapshot("IC-MCU").unwrap().on_hand, Decimal::from(100));
    assert!(engine.reverse("IC-MCU", scrap, ACTOR).is_err());
}

#[test]
fn test_shortage_report_views_agree() {
    let engine = engine(PlanningConfig::new());
    let report = engine.shortage_report();

    assert_eq!(report.shortages.len(), 1);
    // 兩張訂單都需要缺料物料
    assert_eq!(report.by_customer.len(), 2);
    assert_eq!(report.by_customer[0].customer_id, "ACME");
    assert_eq!(
        report.by_customer[1].orders[0].materials[0].shortage,
        report.shortages[0].shortage
    );

    let smt = report
        .by_resource_type
        .iter()
        .find(|g| g.resource_type == "SMT")
        .unwrap();
    assert_eq!(smt.materials, report.shortages);
    assert!(report.by_resource_type.iter().all(|g| g.resource_type != "THT"));

    assert_eq!(report.affected_assemblies[0].product_id, "PCBA-100");
    assert_eq!(report.affected_assemblies[0].total_units_ordered, Decimal::from(130));
    assert!(report.requirements.diagnostics.is_clean());

    // 無寫入時，單獨重算的視圖與報表一致
    assert_eq!(engine.shortages(), report.shortages);
    assert_eq!(engine.shortages_by_customer().len(), report.by_customer.len());
    assert_eq!(
        engine.order_buildability().iter().map(|o| o.status).collect::<Vec<_>>(),
        report.buildability.iter().map(|o| o.status).collect::<Vec<_>>()
    );
}

#[test]
fn test_concurrent_pick_one_winner() {
    let engine = Arc::new(engine(PlanningConfig::new()));
    let id = allocate(&engine, "SO-1", "IC-MCU", 10);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || engine.pick("SO-1", Some(&[id][..])).unwrap().picked)
        })
        .collect();

    let picked: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(picked, 1);
    assert_eq!(
        engine.store().allocation(id).unwrap().status,
        AllocationStatus::Picked
    );
}

#[test]
fn test_conservation_after_workflow() {
    let engine = engine(PlanningConfig::new());
    let a = allocate(&engine, "SO-1", "IC-MCU", 30);
    let b = allocate(&engine, "SO-2", "IC-MCU", 25);
    allocate(&engine, "SO-2", "IC-MCU", 5);

    engine.pick("SO-1", None).unwrap();
    engine.issue("SO-1", None, ACTOR).unwrap();
    engine
        .return_order(
            "SO-1",
            &[ReturnInput::new(
                a,
                Decimal::from(4),
                Decimal::from(25),
                Decimal::ONE,
                ReturnAction::Return,
            )],
            ACTOR,
        )
        .unwrap();
    engine.pick("SO-2", Some(&[b][..])).unwrap();

    let ledger: Decimal = engine
        .store()
        .transactions("IC-MCU")
        .unwrap()
        .iter()
        .map(|tx| tx.stock_effect())
        .sum();
    let reserved: Decimal = ["SO-1", "SO-2"]
        .iter()
        .flat_map(|o| engine.store().allocations_for_order(o))
        .filter(|a| a.status.holds_reservation())
        .map(|a| a.quantity)
        .sum();

    let snap = engine.snapshot("IC-MCU").unwrap();
    assert_eq!(snap.on_hand, ledger);
    assert_eq!(snap.on_hand, Decimal::from(74));
    assert_eq!(snap.allocated, reserved);
    assert_eq!(snap.allocated, Decimal::from(30));
}

proptest! {
    #[test]
    fn prop_receipt_never_increases_shortage(extra in 1i64..500) {
        let engine = engine(PlanningConfig::new());
        let before = engine
            .shortages()
            .iter()
            .find(|s| s.material_id == "IC-MCU")
            .map(|s| s.shortage)
            .unwrap_or(Decimal::ZERO);

        engine.post(receipt("IC-MCU", extra)).unwrap();
        let after = engine
            .shortages()
            .iter()
            .find(|s| s.material_id == "IC-MCU")
            .map(|s| s.shortage)
            .unwrap_or(Decimal::ZERO);

        prop_assert!(after <= before);
    }

    #[test]
    fn prop_buildability_counts_consistent(on_hand in 0i64..300, flux in 0i64..400) {
        let store = Arc::new(InventoryStore::new());
        store.register_material(Material::new("IC-MCU".to_string(), UnitOfMeasure::Each));
        store.register_material(Material::new("FLUX".to_string(), UnitOfMeasure::Gram));
        let planning = Arc::new(planning());
        let engine = ContractMrp::new(store, planning.clone(), planning, PlanningConfig::new()).unwrap();
        if on_hand > 0 {
            engine.post(receipt("IC-MCU", on_hand)).unwrap();
        }
        if flux > 0 {
            engine.post(receipt("FLUX", flux)).unwrap();
        }

        for order in engine.order_buildability() {
            prop_assert_eq!(order.materials_ready + order.materials_short, order.materials_total);
            for m in &order.materials {
                prop_assert!(m.shortage <= m.global_shortage);
            }
        }
    }

    #[test]
    fn prop_conservation_under_random_workflow(
        steps in prop::collection::vec((0u8..5, 1i64..40), 1..30),
    ) {
        let engine = engine(PlanningConfig::new());
        let mut ids = Vec::new();

        for (op, quantity) in steps {
            match op {
                0 => {
                    engine.post(receipt("IC-MCU", quantity)).unwrap();
                }
                1 => {
                    // 可用量不足時允許失敗
                    if let Ok(id) = engine.allocate(Allocation::new(
                        "SO-1".to_string(),
                        "IC-MCU".to_string(),
                        Decimal::from(quantity),
                        ACTOR.to_string(),
                    )) {
                        ids.push(id);
                    }
                }
                2 => {
                    engine.pick("SO-1", None).unwrap();
                }
                3 => {
                    engine.issue("SO-1", None, ACTOR).unwrap();
                }
                _ => {
                    let returns: Vec<ReturnInput> = ids
                        .iter()
                        .map(|&id| {
                            ReturnInput::new(
                                id,
                                Decimal::ONE,
                                Decimal::ONE,
                                Decimal::ZERO,
                                ReturnAction::Return,
                            )
                        })
                        .collect();
                    engine.return_order("SO-1", &returns, ACTOR).unwrap();
                }
            }
        }

        let ledger: Decimal = engine
            .store()
            .transactions("IC-MCU")
            .unwrap()
            .iter()
            .map(|tx| tx.stock_effect())
            .sum();
        let reserved: Decimal = engine
            .store()
            .allocations_for_order("SO-1")
            .iter()
            .filter(|a| a.status.holds_reservation())
            .map(|a| a.quantity)
            .sum();

        let retained: Decimal = engine
            .store()
            .allocations_for_order("SO-1")
            .iter()
            .filter_map(|a| a.return_outcome.as_ref())
            .map(|o| o.retained_quantity())
            .sum();

        let snap = engine.snapshot("IC-MCU").unwrap();
        prop_assert_eq!(snap.on_hand, ledger);
        prop_assert_eq!(snap.allocated, reserved);
        prop_assert_eq!(snap.in_custody, retained);
        prop_assert_eq!(snap.available, snap.on_hand - snap.allocated - snap.in_custody);
    }
}
