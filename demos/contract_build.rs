//! # 代工組裝完整範例
//!
//! 這個範例展示從收料到退料、再到缺料報表的完整流程：
//! - 成品：控制板 PCBA-100、電源板 PCBA-200
//! - 物料：MCU、電容、助焊劑
//! - 訂單：兩個客戶、三張訂單，交期不同
//!
//! 執行：`RUST_LOG=debug cargo run --example contract_build`

use std::sync::Arc;

use chrono::NaiveDate;
use cm_mrp::*;
use rust_decimal::Decimal;

const ACTOR: &str = "demo";

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    println!("===== 代工組裝 MRP 範例 =====");
    println!();

    // ========== 1. 計劃配置 ==========
    println!("步驟 1: 載入計劃配置");
    let config = PlanningConfig::from_json_str(
        r#"{ "demand_basis": "order_quantity", "quantity_precision": 2, "variance_tolerance": "0.5" }"#,
    )?;
    println!("   需求基準: {:?}", config.demand_basis);
    println!("   缺料歸屬: {:?}", config.shortage_attribution);
    println!();

    // ========== 2. 物料、訂單與 BOM ==========
    println!("步驟 2: 建立物料、BOM 與訂單");
    let store = Arc::new(InventoryStore::new());
    store.register_material(
        Material::new("IC-MCU".to_string(), UnitOfMeasure::Each)
            .with_description("32-bit MCU".to_string()),
    );
    store.register_material(Material::new("CAP-10U".to_string(), UnitOfMeasure::Each));
    store.register_material(Material::new("FLUX".to_string(), UnitOfMeasure::Gram));
    store.register_purchase_line(
        PurchaseOrderLine::new("PO-7001".to_string(), "CAP-10U".to_string(), Decimal::from(500))
            .with_quantity_received(Decimal::from(200))
            .with_expected_date(date(2025, 11, 12)?),
    );

    let planning = Arc::new(create_planning()?);
    println!("   訂單數: {}", planning.orders().len());
    println!();

    let engine = ContractMrp::new(store, planning.clone(), planning, config)?;

    // ========== 3. 收料 ==========
    println!("步驟 3: 收料入庫");
    for (material_id, quantity) in [("IC-MCU", 100), ("CAP-10U", 900), ("FLUX", 400)] {
        engine.post(Transaction::new(
            material_id.to_string(),
            Decimal::from(quantity),
            TransactionType::Receipt,
            "receiving".to_string(),
        ))?;
        println!("   {} 入庫 {}", material_id, quantity);
    }
    println!();

    // ========== 4. 分配、揀料、發料 ==========
    println!("步驟 4: SO-1001 分配 → 揀料 → 發料");
    let mcu = engine.allocate(Allocation::new(
        "SO-1001".to_string(),
        "IC-MCU".to_string(),
        Decimal::from(40),
        ACTOR.to_string(),
    ))?;
    // 連結 BOM 行，資源類型（THT）由 BOM 帶入
    let flux_line = engine
        .order_bom("SO-1001")?
        .items
        .iter()
        .find(|item| item.material_id == "FLUX")
        .map(|item| item.id)
        .ok_or_else(|| anyhow::anyhow!("BOM 缺少 FLUX"))?;
    engine.allocate(
        Allocation::new(
            "SO-1001".to_string(),
            "FLUX".to_string(),
            Decimal::from(80),
            ACTOR.to_string(),
        )
        .with_bom_item(flux_line, None),
    )?;

    let picked = engine.pick("SO-1001", None)?;
    let issued = engine.issue("SO-1001", None, ACTOR)?;
    println!("   揀料 {} 筆，發料 {} 筆", picked.picked, issued.issued);

    let consumed = engine.auto_consume("SO-1001", "THT", ACTOR)?;
    println!("   自動耗用 {} 筆 (THT)", consumed.auto_consumed);
    print_snapshot(&engine.snapshot("IC-MCU")?);
    println!();

    // ========== 5. 退料 ==========
    println!("步驟 5: 退料對帳");
    let summary = engine.return_order(
        "SO-1001",
        &[ReturnInput::new(
            mcu,
            Decimal::from(4),
            Decimal::from(35),
            Decimal::ZERO,
            ReturnAction::Return,
        )],
        ACTOR,
    )?;
    println!(
        "   退回 {}，耗用 {}，報廢 {}，差異 {}",
        summary.total_materials_returned,
        summary.total_consumed,
        summary.total_waste,
        summary.total_variance
    );
    for warning in &summary.warnings {
        println!("   ⚠ 物料 {} 差異 {}", warning.material_id, warning.variance);
    }
    print_snapshot(&engine.snapshot("IC-MCU")?);
    println!();

    // ========== 6. 缺料報表 ==========
    println!("步驟 6: 需求與缺料");
    let report = engine.shortage_report();

    println!("   {:<10} {:>10} {:>10} {:>10} {:>10}", "物料", "總需求", "可用", "在途", "淨需求");
    for line in &report.requirements.lines {
        println!(
            "   {:<10} {:>10} {:>10} {:>10} {:>10}",
            line.material_id, line.total_required, line.available, line.on_order, line.net_requirement
        );
    }
    println!();

    for customer in &report.by_customer {
        println!("   客戶 {}：缺料物料 {} 種", customer.customer_id, customer.materials_short);
        for order in &customer.orders {
            let materials: Vec<&str> = order.materials.iter().map(|m| m.material_id.as_str()).collect();
            println!("     {} ({}) → {:?}", order.order_number, order.product_id, materials);
        }
    }
    println!();

    println!("步驟 7: 訂單可生產性");
    for order in &report.buildability {
        println!(
            "   {} {:?}  就緒 {}/{}",
            order.order_id, order.status, order.materials_ready, order.materials_total
        );
    }
    println!();

    let stats = engine.cache().stats();
    println!("BOM 緩存：命中 {}，未命中 {}", stats.hits, stats.misses);
    println!("===== 完成 =====");

    Ok(())
}

fn date(year: i32, month: u32, day: u32) -> anyhow::Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| anyhow::anyhow!("無效日期 {}-{}-{}", year, month, day))
}

fn create_planning() -> anyhow::Result<PlanningSnapshot> {
    let controller = BomRevision::new(
        "REV-100-C".to_string(),
        "PCBA-100".to_string(),
        "C".to_string(),
    )
    .with_items(vec![
        BomItem::new("IC-MCU".to_string(), Decimal::ONE).with_resource_type("SMT".to_string()),
        BomItem::new("CAP-10U".to_string(), Decimal::from(6)).with_resource_type("SMT".to_string()),
        BomItem::new("FLUX".to_string(), Decimal::from(2)).with_resource_type("THT".to_string()),
    ]);

    let power = BomRevision::new(
        "REV-200-A".to_string(),
        "PCBA-200".to_string(),
        "A".to_string(),
    )
    .with_items(vec![
        BomItem::new("CAP-10U".to_string(), Decimal::from(12)),
        BomItem::new("FLUX".to_string(), Decimal::from(3)).with_resource_type("THT".to_string()),
    ]);

    Ok(PlanningSnapshot::new()
        .with_revision(controller)
        .with_revision(power)
        .with_order(
            Order::new(
                "SO-1001".to_string(),
                "ACME".to_string(),
                Decimal::from(40),
                "REV-100-C".to_string(),
            )
            .with_due_date(date(2025, 11, 10)?),
        )
        .with_order(
            Order::new(
                "SO-1002".to_string(),
                "ACME".to_string(),
                Decimal::from(80),
                "REV-100-C".to_string(),
            )
            .with_due_date(date(2025, 11, 20)?),
        )
        .with_order(
            Order::new(
                "SO-2001".to_string(),
                "GLOBEX".to_string(),
                Decimal::from(50),
                "REV-200-A".to_string(),
            )
            .with_due_date(date(2025, 11, 15)?),
        ))
}

fn print_snapshot(snapshot: &StockSnapshot) {
    println!(
        "   {}: 現有 {}，已分配 {}，工單保管 {}，可用 {}",
        snapshot.material_id,
        snapshot.on_hand,
        snapshot.allocated,
        snapshot.in_custody,
        snapshot.available
    );
}
