//! 预约数据模型
//!
//! 性别、年龄段、套餐与状态都是固定的业务常量，这里用枚举表达，
//! 对外的 JSON 字符串与前端约定保持一致。

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// 定义一个与固定字符串一一对应的枚举
macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $value:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $value)]
                $variant,
            )+
        }

        impl $name {
            /// 全部取值，按声明顺序
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $value,)+
                }
            }

            /// 严格匹配，不做大小写或空白处理
            pub fn parse(value: &str) -> Option<Self> {
                match value {
                    $($value => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_enum! {
    /// 性别
    Gender {
        Male => "male",
        Female => "female",
    }
}

string_enum! {
    /// 年龄段
    AgeBand {
        From18To22 => "18-22",
        From23To28 => "23-28",
        From29To35 => "29-35",
        Over35 => "35+",
    }
}

string_enum! {
    /// 套餐
    Plan {
        Monthly => "monthly",
        Quarterly => "quarterly",
        Yearly => "yearly",
    }
}

string_enum! {
    /// 预约状态，目前只会创建为 pending
    ReservationStatus {
        Pending => "pending",
        Paid => "paid",
        Cancelled => "cancelled",
    }
}

/// 请求上下文中采集的元数据
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReservationMetadata {
    #[serde(rename = "userAgent")]
    pub user_agent: String,
    pub ip: String,
    pub referrer: String,
    pub utm_source: String,
    pub utm_medium: String,
    pub utm_campaign: String,
}

/// 预约记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: u64,
    pub reservation_number: String,
    pub phone: String,
    pub nickname: String,
    pub gender: Gender,
    pub age: AgeBand,
    pub plan: Plan,
    pub status: ReservationStatus,
    pub created_at: String,
    pub updated_at: String,
    pub metadata: ReservationMetadata,
}

/// 创建预约的请求体
///
/// 字段保持原始 JSON 值，由校验层统一转换，缺失或类型不对都会得到对应的字段错误。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateReservationRequest {
    #[serde(default)]
    pub phone: Option<Value>,
    #[serde(default)]
    pub nickname: Option<Value>,
    #[serde(default)]
    pub gender: Option<Value>,
    #[serde(default)]
    pub age: Option<Value>,
    #[serde(default)]
    pub plan: Option<Value>,
    #[serde(default)]
    pub referrer: Option<Value>,
    #[serde(default)]
    pub utm_source: Option<Value>,
    #[serde(default)]
    pub utm_medium: Option<Value>,
    #[serde(default)]
    pub utm_campaign: Option<Value>,
}

/// 通过校验后的预约输入
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReservation {
    pub phone: String,
    pub nickname: String,
    pub gender: Gender,
    pub age: AgeBand,
    pub plan: Plan,
    pub referrer: String,
    pub utm_source: String,
    pub utm_medium: String,
    pub utm_campaign: String,
}

/// 由传输层提供的请求信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub user_agent: String,
    pub ip: String,
}

/// 单个字段的校验错误
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub value: String,
    pub msg: &'static str,
    pub path: &'static str,
    pub location: &'static str,
}

impl FieldError {
    pub fn new(path: &'static str, value: impl Into<String>, msg: &'static str) -> Self {
        Self {
            kind: "field",
            value: value.into(),
            msg,
            path,
            location: "body",
        }
    }
}

/// 创建成功后返回给客户端的数据
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationCreated {
    pub reservation_number: String,
    pub plan: Plan,
    pub created_at: String,
}

impl From<&Reservation> for ReservationCreated {
    fn from(r: &Reservation) -> Self {
        Self {
            reservation_number: r.reservation_number.clone(),
            plan: r.plan,
            created_at: r.created_at.clone(),
        }
    }
}

/// 按编号查询时公开的字段，不包含手机号
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationSummary {
    pub reservation_number: String,
    pub nickname: String,
    pub plan: Plan,
    pub status: ReservationStatus,
    pub created_at: String,
}

impl From<&Reservation> for ReservationSummary {
    fn from(r: &Reservation) -> Self {
        Self {
            reservation_number: r.reservation_number.clone(),
            nickname: r.nickname.clone(),
            plan: r.plan,
            status: r.status,
            created_at: r.created_at.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlanCounts {
    pub monthly: usize,
    pub quarterly: usize,
    pub yearly: usize,
}

impl PlanCounts {
    pub fn record(&mut self, plan: Plan) {
        match plan {
            Plan::Monthly => self.monthly += 1,
            Plan::Quarterly => self.quarterly += 1,
            Plan::Yearly => self.yearly += 1,
        }
    }

    pub fn sum(&self) -> usize {
        self.monthly + self.quarterly + self.yearly
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AgeCounts {
    #[serde(rename = "18-22")]
    pub from_18_to_22: usize,
    #[serde(rename = "23-28")]
    pub from_23_to_28: usize,
    #[serde(rename = "29-35")]
    pub from_29_to_35: usize,
    #[serde(rename = "35+")]
    pub over_35: usize,
}

impl AgeCounts {
    pub fn record(&mut self, age: AgeBand) {
        match age {
            AgeBand::From18To22 => self.from_18_to_22 += 1,
            AgeBand::From23To28 => self.from_23_to_28 += 1,
            AgeBand::From29To35 => self.from_29_to_35 += 1,
            AgeBand::Over35 => self.over_35 += 1,
        }
    }

    pub fn sum(&self) -> usize {
        self.from_18_to_22 + self.from_23_to_28 + self.from_29_to_35 + self.over_35
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GenderCounts {
    pub male: usize,
    pub female: usize,
}

impl GenderCounts {
    pub fn record(&mut self, gender: Gender) {
        match gender {
            Gender::Male => self.male += 1,
            Gender::Female => self.female += 1,
        }
    }

    pub fn sum(&self) -> usize {
        self.male + self.female
    }
}

/// 统计快照
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub total: usize,
    pub by_plan: PlanCounts,
    pub by_age: AgeCounts,
    pub by_gender: GenderCounts,
    /// 最近的预约，最新的在前
    pub recent_reservations: Vec<Reservation>,
}
