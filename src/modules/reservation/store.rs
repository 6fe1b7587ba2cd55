use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use thiserror::Error;
use tracing::info;

use super::models::{
    CreateReservationRequest, FieldError, Reservation, ReservationMetadata, ReservationStatus,
    RequestContext, StatsSnapshot,
};
use super::validation::validate_reservation;

/// 预约编号前缀
pub const RESERVATION_NUMBER_PREFIX: &str = "XD";
/// 编号取毫秒时间戳的后 8 位
const NUMBER_SPACE: u64 = 100_000_000;
/// 统计中返回的最近预约条数
pub const RECENT_LIMIT: usize = 10;

#[derive(Debug, Error)]
pub enum ReservationError {
    #[error("参数验证失败")]
    Validation(Vec<FieldError>),

    #[error("该手机号已预约")]
    Duplicate,

    #[error("预约编号已用尽")]
    NumberSpaceExhausted,
}

/// 由编号后缀生成预约编号
pub fn format_reservation_number(suffix: u64) -> String {
    format!("{}{:08}", RESERVATION_NUMBER_PREFIX, suffix % NUMBER_SPACE)
}

#[derive(Debug, Default)]
struct StoreInner {
    /// 按插入顺序保存
    records: Vec<Reservation>,
    by_phone: HashMap<String, usize>,
    by_number: HashMap<String, usize>,
    last_id: u64,
}

impl StoreInner {
    /// 同一毫秒内的编号冲突时顺延后缀，直到找到空闲编号
    fn next_reservation_number(&self, epoch_millis: i64) -> Result<String, ReservationError> {
        if self.by_number.len() as u64 >= NUMBER_SPACE {
            return Err(ReservationError::NumberSpaceExhausted);
        }

        let mut suffix = epoch_millis.rem_euclid(NUMBER_SPACE as i64) as u64;
        loop {
            let candidate = format_reservation_number(suffix);
            if !self.by_number.contains_key(&candidate) {
                return Ok(candidate);
            }
            suffix = (suffix + 1) % NUMBER_SPACE;
        }
    }
}

/// 进程内预约存储
///
/// 手机号与编号各有一份索引，记录本身按插入顺序保存，用于统计最近预约。
/// 查重与写入在同一把写锁内完成。
#[derive(Debug, Default)]
pub struct ReservationStore {
    inner: RwLock<StoreInner>,
}

impl ReservationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 校验并创建预约
    pub fn create(
        &self,
        request: &CreateReservationRequest,
        context: RequestContext,
    ) -> Result<Reservation, ReservationError> {
        self.create_at(request, context, Utc::now())
    }

    /// 以指定时间创建预约
    pub fn create_at(
        &self,
        request: &CreateReservationRequest,
        context: RequestContext,
        now: DateTime<Utc>,
    ) -> Result<Reservation, ReservationError> {
        let input = validate_reservation(request).map_err(ReservationError::Validation)?;

        let mut inner = self.inner.write();
        if inner.by_phone.contains_key(&input.phone) {
            return Err(ReservationError::Duplicate);
        }

        let reservation_number = inner.next_reservation_number(now.timestamp_millis())?;
        inner.last_id += 1;
        let timestamp = now.to_rfc3339_opts(SecondsFormat::Millis, true);

        let reservation = Reservation {
            id: inner.last_id,
            reservation_number,
            phone: input.phone,
            nickname: input.nickname,
            gender: input.gender,
            age: input.age,
            plan: input.plan,
            status: ReservationStatus::Pending,
            created_at: timestamp.clone(),
            updated_at: timestamp,
            metadata: ReservationMetadata {
                user_agent: context.user_agent,
                ip: context.ip,
                referrer: input.referrer,
                utm_source: input.utm_source,
                utm_medium: input.utm_medium,
                utm_campaign: input.utm_campaign,
            },
        };

        let index = inner.records.len();
        inner.by_phone.insert(reservation.phone.clone(), index);
        inner
            .by_number
            .insert(reservation.reservation_number.clone(), index);
        inner.records.push(reservation.clone());
        drop(inner);

        info!(
            reservation_number = %reservation.reservation_number,
            plan = %reservation.plan,
            "[预约成功] {} - {} - {}",
            reservation.reservation_number,
            reservation.phone,
            reservation.plan
        );

        Ok(reservation)
    }

    /// 按预约编号精确查找
    pub fn find_by_number(&self, reservation_number: &str) -> Option<Reservation> {
        let inner = self.inner.read();
        inner
            .by_number
            .get(reservation_number)
            .and_then(|&index| inner.records.get(index))
            .cloned()
    }

    /// 计算统计快照
    pub fn compute_stats(&self) -> StatsSnapshot {
        let inner = self.inner.read();
        let mut snapshot = StatsSnapshot {
            total: inner.records.len(),
            ..Default::default()
        };

        for reservation in &inner.records {
            snapshot.by_plan.record(reservation.plan);
            snapshot.by_age.record(reservation.age);
            snapshot.by_gender.record(reservation.gender);
        }

        snapshot.recent_reservations = inner
            .records
            .iter()
            .rev()
            .take(RECENT_LIMIT)
            .cloned()
            .collect();

        snapshot
    }

    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::reservation::models::{AgeBand, Gender, Plan};
    use chrono::TimeZone;
    use serde_json::{json, Value};

    fn request(phone: &str, nickname: &str, gender: &str, age: &str, plan: &str) -> CreateReservationRequest {
        serde_json::from_value(json!({
            "phone": phone,
            "nickname": nickname,
            "gender": gender,
            "age": age,
            "plan": plan,
        }))
        .unwrap()
    }

    fn valid(phone: &str) -> CreateReservationRequest {
        request(phone, "小明", "male", "18-22", "monthly")
    }

    fn is_reservation_number(number: &str) -> bool {
        number.len() == 10
            && number.starts_with(RESERVATION_NUMBER_PREFIX)
            && number[2..].chars().all(|c| c.is_ascii_digit())
    }

    #[test]
    fn test_create_and_lookup() {
        let store = ReservationStore::new();
        let context = RequestContext {
            user_agent: "Mozilla/5.0".into(),
            ip: "10.0.0.8".into(),
        };

        let created = store.create(&valid("13800138000"), context).unwrap();
        assert!(is_reservation_number(&created.reservation_number));
        assert_eq!(created.status, ReservationStatus::Pending);
        assert_eq!(created.created_at, created.updated_at);
        assert_eq!(created.metadata.ip, "10.0.0.8");
        assert_eq!(created.metadata.user_agent, "Mozilla/5.0");

        let found = store.find_by_number(&created.reservation_number).unwrap();
        assert_eq!(found.nickname, "小明");
        assert_eq!(found.plan, Plan::Monthly);
        assert_eq!(found.status, ReservationStatus::Pending);
    }

    #[test]
    fn test_number_uses_last_eight_millis_digits() {
        let store = ReservationStore::new();
        let now = Utc.timestamp_millis_opt(1_700_000_123_456).unwrap();

        let created = store
            .create_at(&valid("13800138000"), RequestContext::default(), now)
            .unwrap();
        assert_eq!(created.reservation_number, "XD00123456");
        assert_eq!(created.created_at, "2023-11-14T22:15:23.456Z");
    }

    #[test]
    fn test_same_millisecond_numbers_stay_unique() {
        let store = ReservationStore::new();
        let now = Utc.timestamp_millis_opt(1_700_099_999_999).unwrap();

        let first = store
            .create_at(&valid("13800138000"), RequestContext::default(), now)
            .unwrap();
        let second = store
            .create_at(&valid("13800138001"), RequestContext::default(), now)
            .unwrap();

        assert_eq!(first.reservation_number, "XD99999999");
        assert_eq!(second.reservation_number, "XD00000000");
        assert_eq!(
            store.find_by_number("XD00000000").unwrap().phone,
            "13800138001"
        );
    }

    #[test]
    fn test_duplicate_phone_rejected() {
        let store = ReservationStore::new();
        store.create(&valid("13800138000"), RequestContext::default()).unwrap();

        let again = request("13800138000", "小红", "female", "23-28", "yearly");
        let err = store.create(&again, RequestContext::default()).unwrap_err();

        assert!(matches!(err, ReservationError::Duplicate));
        assert_eq!(err.to_string(), "该手机号已预约");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_validation_failure_leaves_store_untouched() {
        let store = ReservationStore::new();
        let err = store
            .create(&request("123", "a", "male", "18-22", "monthly"), RequestContext::default())
            .unwrap_err();

        match err {
            ReservationError::Validation(errors) => {
                let paths: Vec<_> = errors.iter().map(|e| e.path).collect();
                assert_eq!(paths, vec!["phone", "nickname"]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(store.is_empty());
    }

    #[test]
    fn test_ids_increase() {
        let store = ReservationStore::new();
        let a = store.create(&valid("13800138000"), RequestContext::default()).unwrap();
        let b = store.create(&valid("13800138001"), RequestContext::default()).unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
    }

    #[test]
    fn test_find_missing_number() {
        let store = ReservationStore::new();
        assert!(store.find_by_number("XD12345678").is_none());
    }

    #[test]
    fn test_stats_counts_sum_to_total() {
        let store = ReservationStore::new();
        let genders = ["male", "female"];
        let ages = ["18-22", "23-28", "29-35", "35+"];
        let plans = ["monthly", "quarterly", "yearly"];

        for i in 0..17 {
            let phone = format!("139{:08}", i);
            let req = request(&phone, "测试用户", genders[i % 2], ages[i % 4], plans[i % 3]);
            store.create(&req, RequestContext::default()).unwrap();
        }

        let stats = store.compute_stats();
        assert_eq!(stats.total, 17);
        assert_eq!(stats.total, store.len());
        assert_eq!(stats.by_plan.sum(), 17);
        assert_eq!(stats.by_age.sum(), 17);
        assert_eq!(stats.by_gender.sum(), 17);
        assert_eq!(stats.by_plan.monthly, 6);
        assert_eq!(stats.by_age.from_18_to_22, 5);
        assert_eq!(stats.by_gender.male, 9);
    }

    #[test]
    fn test_recent_reservations_newest_first() {
        let store = ReservationStore::new();
        for i in 0..12 {
            let phone = format!("137{:08}", i);
            store.create(&valid(&phone), RequestContext::default()).unwrap();
        }

        let recent = store.compute_stats().recent_reservations;
        assert_eq!(recent.len(), RECENT_LIMIT);
        let phones: Vec<_> = recent.iter().map(|r| r.phone.as_str()).collect();
        assert_eq!(phones[0], "13700000011");
        assert_eq!(phones[9], "13700000002");
        assert!(recent.windows(2).all(|w| w[0].id > w[1].id));
    }

    #[test]
    fn test_recent_reservations_short_store() {
        let store = ReservationStore::new();
        store.create(&valid("13800138000"), RequestContext::default()).unwrap();
        store
            .create(
                &request("13800138001", "小红", "female", "35+", "yearly"),
                RequestContext::default(),
            )
            .unwrap();

        let stats = store.compute_stats();
        assert_eq!(stats.recent_reservations.len(), 2);
        assert_eq!(stats.recent_reservations[0].gender, Gender::Female);
        assert_eq!(stats.recent_reservations[0].age, AgeBand::Over35);
        assert_eq!(stats.recent_reservations[1].nickname, "小明");

        let value: Value = serde_json::to_value(&stats).unwrap();
        assert_eq!(value["recentReservations"][0]["reservationNumber"].as_str().map(|s| s.len()), Some(10));
    }

    #[test]
    fn test_empty_stats() {
        let stats = ReservationStore::new().compute_stats();
        assert_eq!(stats.total, 0);
        assert!(stats.recent_reservations.is_empty());
    }
}
