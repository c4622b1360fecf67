use tera::{Context, Tera};

pub const CONSULTATION_EMAIL_SUBJECT: &str = "[상담 신청] {{ name }}님의 새 상담 신청";

pub const CONSULTATION_EMAIL_BODY: &str = r#"새 상담 신청이 접수되었습니다.

이름: {{ name }}
연락처: {{ phone }}
{% if email %}이메일: {{ email }}
{% endif %}{% if child_age %}자녀 나이: {{ child_age }}세
{% endif %}관심 분야: {{ interest }}
{% if preferred_date %}희망 일정: {{ preferred_date }}
{% endif %}{% if message %}
문의 내용:
{{ message }}
{% endif %}
접수 시각: {{ created_at }}
"#;

pub const CONSULTATION_SMS: &str =
    "[상담신청] {{ name }}({{ phone }}) - {{ interest }}";

pub const REGISTRATION_EMAIL_SUBJECT: &str = "[수강 신청] {{ program_name }} - {{ student_name }}";

pub const REGISTRATION_EMAIL_BODY: &str = r#"새 수강 신청이 접수되었습니다.

프로그램: {{ program_name }}
학생 이름: {{ student_name }}{% if student_age %} ({{ student_age }}세){% endif %}
보호자: {{ parent_name }}
연락처: {{ parent_phone }}
{% if email %}이메일: {{ email }}
{% endif %}{% if message %}
요청 사항:
{{ message }}
{% endif %}
접수 시각: {{ created_at }}
"#;

pub const REGISTRATION_SMS: &str =
    "[수강신청] {{ program_name }} / {{ student_name }} / {{ parent_phone }}";

pub const NEWSLETTER_FOOTER: &str = r#"

---
{{ name | default(value="구독자") }}님, 뉴스레터 수신을 원하지 않으시면 {{ unsubscribe_url }} 에서 구독을 해지할 수 있습니다.
"#;

/// Renders a one-off template. Autoescaping is off: every channel is plain text.
pub fn render(template: &str, context: &Context) -> Result<String, tera::Error> {
    Tera::one_off(template, context, false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consultation_body_skips_missing_fields() {
        let mut context = Context::new();
        context.insert("name", "박지우");
        context.insert("phone", "010-2222-3333");
        context.insert("interest", "로봇 코딩");
        context.insert("email", &Option::<String>::None);
        context.insert("child_age", &Some(9));
        context.insert("preferred_date", &Option::<String>::None);
        context.insert("message", &Option::<String>::None);
        context.insert("created_at", "2025-03-01T09:00:00.000Z");

        let body = render(CONSULTATION_EMAIL_BODY, &context).unwrap();
        assert!(body.contains("이름: 박지우"));
        assert!(body.contains("자녀 나이: 9세"));
        assert!(!body.contains("이메일"));
        assert!(!body.contains("문의 내용"));

        let sms = render(CONSULTATION_SMS, &context).unwrap();
        assert_eq!(sms, "[상담신청] 박지우(010-2222-3333) - 로봇 코딩");
    }

    #[test]
    fn test_footer_default_name() {
        let mut context = Context::new();
        context.insert("unsubscribe_url", "https://academy.example/unsubscribe");
        let footer = render(NEWSLETTER_FOOTER, &context).unwrap();
        assert!(footer.contains("구독자님"));
    }
}
