//! Report arithmetic.
//!
//! The handlers load rows through the repository; everything below is pure so the
//! numbers can be checked without a database.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::{
    CancellationFeeState, CancellationReport, CompanyTreasury, DateRange, MonthlyRevenue, Order,
    OrderCancellationFee, OrderState, OrderStateCount, OrderStateReport, ReservedVehiclePerDay,
    ReservedVehicleState, RevenueReport, TreasurySource, Vehicle, VehicleUtilization,
    VehicleUtilizationReport, percent_of, round2,
};

/// revenue
///
/// Splits the treasury movements created inside `range` by source. Refunds are
/// reported as a positive total and subtracted from the net.
pub fn revenue(range: &DateRange, entries: &[CompanyTreasury]) -> RevenueReport {
    let mut payments_total = Decimal::ZERO;
    let mut refunds_total = Decimal::ZERO;
    let mut cancellation_fees_total = Decimal::ZERO;
    let mut by_month: BTreeMap<(i32, u32), Decimal> = BTreeMap::new();

    for entry in entries
        .iter()
        .filter(|e| range.contains(e.created_at.date_naive()))
    {
        match entry.source {
            TreasurySource::OrderPayment => payments_total += entry.amount,
            TreasurySource::PaymentRefund => refunds_total += entry.amount.abs(),
            TreasurySource::CancellationFee => cancellation_fees_total += entry.amount,
        }
        let day = entry.created_at.date_naive();
        *by_month.entry((day.year(), day.month())).or_default() += entry.amount;
    }

    RevenueReport {
        from: range.from,
        to: range.to,
        payments_total: round2(payments_total),
        refunds_total: round2(refunds_total),
        cancellation_fees_total: round2(cancellation_fees_total),
        net_revenue: round2(payments_total - refunds_total + cancellation_fees_total),
        by_month: by_month
            .into_iter()
            .map(|((year, month), net)| MonthlyRevenue {
                year,
                month,
                net: round2(net),
            })
            .collect(),
    }
}

/// cancellations
///
/// Orders created inside `range`, how many were cancelled, and where their fees stand.
pub fn cancellations(
    range: &DateRange,
    orders: &[Order],
    fees: &[OrderCancellationFee],
) -> CancellationReport {
    let in_range: Vec<&Order> = orders
        .iter()
        .filter(|o| range.contains(o.created_at.date_naive()))
        .collect();
    let total_orders = in_range.len() as i64;
    let cancelled_orders = in_range
        .iter()
        .filter(|o| o.state == OrderState::Cancelled)
        .count() as i64;

    let order_ids: HashSet<Uuid> = in_range.iter().map(|o| o.id).collect();
    let fee_total = |state: CancellationFeeState| -> Decimal {
        round2(
            fees.iter()
                .filter(|f| f.state == state && order_ids.contains(&f.order_id))
                .map(|f| f.amount)
                .sum(),
        )
    };

    CancellationReport {
        from: range.from,
        to: range.to,
        total_orders,
        cancelled_orders,
        cancellation_rate: percent_of(cancelled_orders, total_orders),
        fees_paid: fee_total(CancellationFeeState::Paid),
        fees_waived: fee_total(CancellationFeeState::Waived),
        fees_unpaid: fee_total(CancellationFeeState::Unpaid),
    }
}

/// utilization
///
/// For every vehicle: distinct `Reserved` days inside `range` over the number of days
/// in `range`. Sorted busiest first, ties broken by plate number.
pub fn utilization(
    range: &DateRange,
    vehicles: &[Vehicle],
    rows: &[ReservedVehiclePerDay],
) -> VehicleUtilizationReport {
    let total_days = range.total_days();

    let mut reserved: HashMap<Uuid, BTreeSet<NaiveDate>> = HashMap::new();
    for row in rows
        .iter()
        .filter(|r| r.state == ReservedVehicleState::Reserved && range.contains(r.day))
    {
        reserved.entry(row.vehicle_id).or_default().insert(row.day);
    }

    let mut lines: Vec<VehicleUtilization> = vehicles
        .iter()
        .map(|v| {
            let reserved_days = reserved.get(&v.id).map_or(0, |days| days.len() as i64);
            VehicleUtilization {
                vehicle_id: v.id,
                plate_number: v.plate_number.clone(),
                reserved_days,
                total_days,
                utilization_percent: percent_of(reserved_days, total_days),
            }
        })
        .collect();

    lines.sort_by(|a, b| {
        b.utilization_percent
            .cmp(&a.utilization_percent)
            .then_with(|| a.plate_number.cmp(&b.plate_number))
    });

    let average_utilization_percent = if lines.is_empty() {
        Decimal::ZERO
    } else {
        let sum: Decimal = lines.iter().map(|l| l.utilization_percent).sum();
        round2(sum / Decimal::from(lines.len() as i64))
    };

    VehicleUtilizationReport {
        from: range.from,
        to: range.to,
        vehicles: lines,
        average_utilization_percent,
    }
}

/// order_states
///
/// Count and share of every `OrderState` among orders created inside `range`.
/// States without orders are listed with zeros.
pub fn order_states(range: &DateRange, orders: &[Order]) -> OrderStateReport {
    let mut counts: HashMap<OrderState, i64> = HashMap::new();
    let mut total_orders = 0;
    for order in orders
        .iter()
        .filter(|o| range.contains(o.created_at.date_naive()))
    {
        *counts.entry(order.state).or_default() += 1;
        total_orders += 1;
    }

    OrderStateReport {
        from: range.from,
        to: range.to,
        total_orders,
        states: OrderState::ALL
            .iter()
            .map(|state| {
                let count = counts.get(state).copied().unwrap_or(0);
                OrderStateCount {
                    state: *state,
                    count,
                    percent: percent_of(count, total_orders),
                }
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CreateVehicleRequest;
    use chrono::{TimeZone, Utc};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn vehicle(plate: &str) -> Vehicle {
        Vehicle::new(CreateVehicleRequest {
            sub_category_id: Uuid::new_v4(),
            city_id: Uuid::new_v4(),
            plate_number: plate.to_string(),
            brand: "Dacia".to_string(),
            model: "Duster".to_string(),
            year: 2022,
            color: "grey".to_string(),
        })
    }

    fn entry(source: TreasurySource, amount: i64, y: i32, m: u32, d: u32) -> CompanyTreasury {
        let mut e = CompanyTreasury::new(source, Uuid::new_v4(), Decimal::new(amount, 2), String::new());
        e.created_at = Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap();
        e
    }

    fn order_in(state: OrderState, y: i32, m: u32, d: u32) -> Order {
        let mut o = Order::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            date(y, m, d),
            date(y, m, d),
            Decimal::new(10000, 2),
            Uuid::new_v4(),
        )
        .unwrap();
        o.state = state;
        o.created_at = Utc.with_ymd_and_hms(y, m, d, 9, 0, 0).unwrap();
        o
    }

    #[test]
    fn three_reserved_days_in_a_ten_day_window_is_thirty_percent() {
        let range = DateRange::new(date(2025, 5, 1), date(2025, 5, 10)).unwrap();
        let busy = vehicle("BB-200");
        let idle = vehicle("AA-100");
        let order = Uuid::new_v4();
        let mut released = ReservedVehiclePerDay::new(busy.id, order, date(2025, 5, 6));
        released.state = ReservedVehicleState::Released;
        let rows = vec![
            ReservedVehiclePerDay::new(busy.id, order, date(2025, 4, 30)),
            ReservedVehiclePerDay::new(busy.id, order, date(2025, 5, 1)),
            ReservedVehiclePerDay::new(busy.id, order, date(2025, 5, 2)),
            ReservedVehiclePerDay::new(busy.id, order, date(2025, 5, 3)),
            released,
        ];

        let report = utilization(&range, &[idle.clone(), busy.clone()], &rows);

        assert_eq!(report.vehicles[0].plate_number, "BB-200");
        assert_eq!(report.vehicles[0].reserved_days, 3);
        assert_eq!(report.vehicles[0].total_days, 10);
        assert_eq!(report.vehicles[0].utilization_percent, Decimal::new(3000, 2));
        assert_eq!(report.vehicles[1].utilization_percent, Decimal::ZERO);
        assert_eq!(report.average_utilization_percent, Decimal::new(1500, 2));
    }

    #[test]
    fn utilization_ties_are_ordered_by_plate() {
        let range = DateRange::new(date(2025, 5, 1), date(2025, 5, 3)).unwrap();
        let report = utilization(&range, &[vehicle("ZZ-1"), vehicle("AA-1")], &[]);
        let plates: Vec<_> = report.vehicles.iter().map(|v| v.plate_number.as_str()).collect();
        assert_eq!(plates, vec!["AA-1", "ZZ-1"]);
    }

    #[test]
    fn empty_fleet_averages_to_zero() {
        let range = DateRange::new(date(2025, 5, 1), date(2025, 5, 3)).unwrap();
        let report = utilization(&range, &[], &[]);
        assert!(report.vehicles.is_empty());
        assert_eq!(report.average_utilization_percent, Decimal::ZERO);
    }

    #[test]
    fn revenue_nets_refunds_and_groups_by_month() {
        let range = DateRange::new(date(2025, 1, 1), date(2025, 2, 28)).unwrap();
        let entries = vec![
            entry(TreasurySource::OrderPayment, 20000, 2025, 1, 10),
            entry(TreasurySource::PaymentRefund, -5000, 2025, 1, 20),
            entry(TreasurySource::CancellationFee, 1350, 2025, 2, 3),
            entry(TreasurySource::OrderPayment, 99900, 2025, 3, 1),
        ];

        let report = revenue(&range, &entries);

        assert_eq!(report.payments_total, Decimal::new(20000, 2));
        assert_eq!(report.refunds_total, Decimal::new(5000, 2));
        assert_eq!(report.cancellation_fees_total, Decimal::new(1350, 2));
        assert_eq!(report.net_revenue, Decimal::new(16350, 2));
        assert_eq!(
            report.by_month,
            vec![
                MonthlyRevenue { year: 2025, month: 1, net: Decimal::new(15000, 2) },
                MonthlyRevenue { year: 2025, month: 2, net: Decimal::new(1350, 2) },
            ]
        );
    }

    #[test]
    fn cancellation_rate_and_fee_totals() {
        let range = DateRange::new(date(2025, 6, 1), date(2025, 6, 30)).unwrap();
        let cancelled = order_in(OrderState::Cancelled, 2025, 6, 2);
        let orders = vec![
            cancelled.clone(),
            order_in(OrderState::Completed, 2025, 6, 3),
            order_in(OrderState::Pending, 2025, 6, 4),
            order_in(OrderState::Cancelled, 2025, 7, 1),
        ];
        let mut paid = OrderCancellationFee::new(cancelled.id, Decimal::new(1000, 2));
        paid.state = CancellationFeeState::Paid;
        let unrelated = OrderCancellationFee::new(Uuid::new_v4(), Decimal::new(500, 2));

        let report = cancellations(&range, &orders, &[paid, unrelated]);

        assert_eq!(report.total_orders, 3);
        assert_eq!(report.cancelled_orders, 1);
        assert_eq!(report.cancellation_rate, Decimal::new(3333, 2));
        assert_eq!(report.fees_paid, Decimal::new(1000, 2));
        assert_eq!(report.fees_unpaid, Decimal::ZERO);
    }

    #[test]
    fn cancellation_rate_without_orders_is_zero() {
        let range = DateRange::new(date(2025, 6, 1), date(2025, 6, 30)).unwrap();
        let report = cancellations(&range, &[], &[]);
        assert_eq!(report.cancellation_rate, Decimal::ZERO);
    }

    #[test]
    fn order_state_breakdown_lists_every_state() {
        let range = DateRange::new(date(2025, 6, 1), date(2025, 6, 30)).unwrap();
        let orders = vec![
            order_in(OrderState::Pending, 2025, 6, 1),
            order_in(OrderState::Pending, 2025, 6, 2),
            order_in(OrderState::Completed, 2025, 6, 3),
            order_in(OrderState::Completed, 2025, 6, 4),
        ];

        let report = order_states(&range, &orders);

        assert_eq!(report.total_orders, 4);
        assert_eq!(report.states.len(), 5);
        assert_eq!(report.states[0].state, OrderState::Pending);
        assert_eq!(report.states[0].percent, Decimal::new(5000, 2));
        assert_eq!(report.states[1].count, 0);
        assert_eq!(report.states[3].count, 2);
    }
}
