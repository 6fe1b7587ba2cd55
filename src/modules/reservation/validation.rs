use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use super::models::{AgeBand, CreateReservationRequest, FieldError, Gender, NewReservation, Plan};

pub const PHONE_MESSAGE: &str = "请输入有效的手机号";
pub const NICKNAME_MESSAGE: &str = "昵称长度应为2-12个字符";
pub const GENDER_MESSAGE: &str = "请选择性别";
pub const AGE_MESSAGE: &str = "请选择年龄段";
pub const PLAN_MESSAGE: &str = "请选择套餐";

pub const NICKNAME_MIN_LEN: usize = 2;
pub const NICKNAME_MAX_LEN: usize = 12;

lazy_static! {
    // 中国大陆手机号，可带 +86 / 0086 前缀
    static ref PHONE_REGEX: Regex =
        Regex::new(r"^((\+|00)86)?(1[3-9]|9[28])\d{9}$").expect("invalid phone regex");
}

/// 把 JSON 字段转成待校验的字符串
///
/// 字符串原样使用，数字和布尔值转成文本，其余（缺失、null、数组、对象）视为空串。
pub fn field_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

pub fn is_valid_phone(phone: &str) -> bool {
    PHONE_REGEX.is_match(phone)
}

/// 昵称长度按字符计算，忽略 U+FE0E / U+FE0F 变体选择符
pub fn nickname_length(nickname: &str) -> usize {
    nickname
        .chars()
        .filter(|c| !matches!(c, '\u{FE0E}' | '\u{FE0F}'))
        .count()
}

pub fn is_valid_nickname(nickname: &str) -> bool {
    (NICKNAME_MIN_LEN..=NICKNAME_MAX_LEN).contains(&nickname_length(nickname))
}

/// 校验创建预约的请求
///
/// 不会在第一个错误处停止，所有不合法字段按 phone、nickname、gender、age、plan 的顺序返回。
pub fn validate_reservation(
    request: &CreateReservationRequest,
) -> Result<NewReservation, Vec<FieldError>> {
    let mut errors = Vec::new();

    let phone = field_text(request.phone.as_ref());
    if !is_valid_phone(&phone) {
        errors.push(FieldError::new("phone", phone.clone(), PHONE_MESSAGE));
    }

    let nickname = field_text(request.nickname.as_ref());
    if !is_valid_nickname(&nickname) {
        errors.push(FieldError::new("nickname", nickname.clone(), NICKNAME_MESSAGE));
    }

    let gender_text = field_text(request.gender.as_ref());
    let gender = Gender::parse(&gender_text);
    if gender.is_none() {
        errors.push(FieldError::new("gender", gender_text, GENDER_MESSAGE));
    }

    let age_text = field_text(request.age.as_ref());
    let age = AgeBand::parse(&age_text);
    if age.is_none() {
        errors.push(FieldError::new("age", age_text, AGE_MESSAGE));
    }

    let plan_text = field_text(request.plan.as_ref());
    let plan = Plan::parse(&plan_text);
    if plan.is_none() {
        errors.push(FieldError::new("plan", plan_text, PLAN_MESSAGE));
    }

    match (gender, age, plan) {
        (Some(gender), Some(age), Some(plan)) if errors.is_empty() => Ok(NewReservation {
            phone,
            nickname,
            gender,
            age,
            plan,
            referrer: field_text(request.referrer.as_ref()),
            utm_source: field_text(request.utm_source.as_ref()),
            utm_medium: field_text(request.utm_medium.as_ref()),
            utm_campaign: field_text(request.utm_campaign.as_ref()),
        }),
        _ => Err(errors),
    }
}
