use serde::Serialize;
use std::sync::Arc;
use tera::Context;
use tracing::{info, warn};

use super::senders::{email::EmailSender, sms::SmsSender, NotificationSender};
use super::templates;
use crate::db::entities::{
    consultation::Consultation,
    newsletter::{Newsletter, NewsletterSubscriber},
    registration::Registration,
};
use crate::db::timestamp;
use crate::server::config::ServerConfig;

/// Which channels actually delivered. Failures are logged, never raised.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryReport {
    pub email_sent: bool,
    pub sms_sent: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsletterReport {
    pub recipients: u32,
    pub delivered: u32,
    pub failed: u32,
}

pub struct NotificationService {
    email: Option<Arc<dyn NotificationSender>>,
    sms: Option<Arc<dyn NotificationSender>>,
    admin_email: Option<String>,
    admin_phone: Option<String>,
    frontend_url: String,
}

impl NotificationService {
    pub fn new(
        email: Option<Arc<dyn NotificationSender>>,
        sms: Option<Arc<dyn NotificationSender>>,
        admin_email: Option<String>,
        admin_phone: Option<String>,
        frontend_url: String,
    ) -> Self {
        Self {
            email,
            sms,
            admin_email,
            admin_phone,
            frontend_url,
        }
    }

    /// Builds the configured channels. A channel whose setup fails is disabled with a warning.
    pub fn from_config(config: &ServerConfig) -> Self {
        let email: Option<Arc<dyn NotificationSender>> =
            config.smtp.as_ref().and_then(|smtp| match EmailSender::new(smtp) {
                Ok(sender) => Some(Arc::new(sender) as Arc<dyn NotificationSender>),
                Err(e) => {
                    warn!(error = %e, "Email channel disabled.");
                    None
                }
            });
        let sms: Option<Arc<dyn NotificationSender>> = config
            .sms
            .clone()
            .map(|sms| Arc::new(SmsSender::new(sms)) as Arc<dyn NotificationSender>);

        info!(
            email = email.is_some(),
            sms = sms.is_some(),
            "Notification channels initialised."
        );
        Self::new(
            email,
            sms,
            config.admin_email.clone(),
            config.admin_phone.clone(),
            config.frontend_url.clone(),
        )
    }

    /// A service with no channels; every delivery reports `false`.
    pub fn disabled() -> Self {
        Self::new(None, None, None, None, String::new())
    }

    async fn deliver(
        sender: Option<&Arc<dyn NotificationSender>>,
        recipient: Option<&str>,
        subject: &str,
        body: &str,
    ) -> bool {
        let (Some(sender), Some(recipient)) = (sender, recipient) else {
            return false;
        };
        match sender.send(recipient, subject, body).await {
            Ok(()) => true,
            Err(e) => {
                warn!(channel = sender.channel(), error = %e, "Notification delivery failed.");
                false
            }
        }
    }

    async fn notify_admin(&self, subject_tpl: &str, body_tpl: &str, sms_tpl: &str, context: &Context) -> DeliveryReport {
        let rendered = templates::render(subject_tpl, context).and_then(|subject| {
            Ok((
                subject,
                templates::render(body_tpl, context)?,
                templates::render(sms_tpl, context)?,
            ))
        });
        let (subject, body, sms_text) = match rendered {
            Ok(parts) => parts,
            Err(e) => {
                warn!(error = %e, "Failed to render admin notification.");
                return DeliveryReport::default();
            }
        };

        let (email_sent, sms_sent) = tokio::join!(
            Self::deliver(self.email.as_ref(), self.admin_email.as_deref(), &subject, &body),
            Self::deliver(self.sms.as_ref(), self.admin_phone.as_deref(), &subject, &sms_text),
        );
        DeliveryReport {
            email_sent,
            sms_sent,
        }
    }

    pub async fn notify_admin_new_consultation(&self, consultation: &Consultation) -> DeliveryReport {
        let mut context = Context::new();
        context.insert("name", &consultation.name);
        context.insert("phone", &consultation.phone);
        context.insert("email", &consultation.email);
        context.insert("child_age", &consultation.child_age);
        context.insert("interest", &consultation.interest);
        context.insert("preferred_date", &consultation.preferred_date);
        context.insert("message", &consultation.message);
        context.insert("created_at", &timestamp::format(&consultation.created_at));

        self.notify_admin(
            templates::CONSULTATION_EMAIL_SUBJECT,
            templates::CONSULTATION_EMAIL_BODY,
            templates::CONSULTATION_SMS,
            &context,
        )
        .await
    }

    pub async fn notify_admin_new_registration(&self, registration: &Registration) -> DeliveryReport {
        let mut context = Context::new();
        context.insert("program_name", &registration.program_name);
        context.insert("student_name", &registration.student_name);
        context.insert("student_age", &registration.student_age);
        context.insert("parent_name", &registration.parent_name);
        context.insert("parent_phone", &registration.parent_phone);
        context.insert("email", &registration.email);
        context.insert("message", &registration.message);
        context.insert("created_at", &timestamp::format(&registration.created_at));

        self.notify_admin(
            templates::REGISTRATION_EMAIL_SUBJECT,
            templates::REGISTRATION_EMAIL_BODY,
            templates::REGISTRATION_SMS,
            &context,
        )
        .await
    }

    pub fn can_send_email(&self) -> bool {
        self.email.is_some()
    }

    /// Mails the newsletter to each subscriber, one message per recipient.
    pub async fn send_newsletter(
        &self,
        newsletter: &Newsletter,
        subscribers: &[NewsletterSubscriber],
    ) -> NewsletterReport {
        let mut report = NewsletterReport {
            recipients: subscribers.len() as u32,
            ..Default::default()
        };
        let unsubscribe_url = format!("{}/newsletter/unsubscribe", self.frontend_url.trim_end_matches('/'));

        for subscriber in subscribers {
            let mut context = Context::new();
            if let Some(name) = &subscriber.name {
                context.insert("name", name);
            }
            context.insert("unsubscribe_url", &unsubscribe_url);
            let footer = templates::render(templates::NEWSLETTER_FOOTER, &context).unwrap_or_default();
            let body = format!("{}{}", newsletter.content, footer);

            if Self::deliver(self.email.as_ref(), Some(&subscriber.email), &newsletter.title, &body).await {
                report.delivered += 1;
            } else {
                report.failed += 1;
            }
        }

        info!(
            newsletter_id = %newsletter.id,
            recipients = report.recipients,
            delivered = report.delivered,
            failed = report.failed,
            "Newsletter dispatched."
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::enums::ConsultationStatus;
    use crate::notifications::senders::SenderError;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;

    struct RecordingSender {
        fail: bool,
        sent: Mutex<Vec<(String, String)>>,
    }

    impl RecordingSender {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                fail,
                sent: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl NotificationSender for RecordingSender {
        fn channel(&self) -> &'static str {
            "recording"
        }

        async fn send(&self, recipient: &str, _subject: &str, body: &str) -> Result<(), SenderError> {
            if self.fail {
                return Err(SenderError::SendFailed("gateway down".to_string()));
            }
            self.sent
                .lock()
                .unwrap()
                .push((recipient.to_string(), body.to_string()));
            Ok(())
        }
    }

    fn consultation() -> Consultation {
        Consultation {
            id: "c-1".to_string(),
            name: "최서연".to_string(),
            phone: "010-1111-2222".to_string(),
            email: None,
            child_age: Some(8),
            interest: "코딩".to_string(),
            message: Some("주말반 문의".to_string()),
            preferred_date: None,
            status: ConsultationStatus::Pending,
            admin_memo: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_failures_are_reported_not_raised() {
        let email = RecordingSender::new(false);
        let sms = RecordingSender::new(true);
        let service = NotificationService::new(
            Some(email.clone()),
            Some(sms.clone()),
            Some("admin@academy.kr".to_string()),
            Some("010-9999-0000".to_string()),
            "https://academy.kr".to_string(),
        );

        let report = service.notify_admin_new_consultation(&consultation()).await;
        assert_eq!(
            report,
            DeliveryReport {
                email_sent: true,
                sms_sent: false
            }
        );
        let sent = email.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "admin@academy.kr");
        assert!(sent[0].1.contains("주말반 문의"));
    }

    #[tokio::test]
    async fn test_unconfigured_channels_report_false() {
        let report = NotificationService::disabled()
            .notify_admin_new_consultation(&consultation())
            .await;
        assert_eq!(report, DeliveryReport::default());
    }

    #[tokio::test]
    async fn test_newsletter_counts() {
        let email = RecordingSender::new(false);
        let service = NotificationService::new(
            Some(email.clone()),
            None,
            None,
            None,
            "https://academy.kr/".to_string(),
        );
        let now = Utc::now();
        let newsletter = Newsletter {
            id: "n-1".to_string(),
            title: "3월 소식".to_string(),
            content: "봄학기 개강 안내".to_string(),
            status: crate::db::enums::NewsletterStatus::Draft,
            sent_at: None,
            recipient_count: 0,
            created_at: now,
            updated_at: now,
        };
        let subscribers: Vec<NewsletterSubscriber> = ["a@x.kr", "b@x.kr"]
            .iter()
            .map(|email| NewsletterSubscriber {
                id: email.to_string(),
                email: email.to_string(),
                name: None,
                is_active: true,
                subscribed_at: now,
                unsubscribed_at: None,
            })
            .collect();

        let report = service.send_newsletter(&newsletter, &subscribers).await;
        assert_eq!(report.recipients, 2);
        assert_eq!(report.delivered, 2);
        assert_eq!(report.failed, 0);
        let sent = email.sent.lock().unwrap();
        assert!(sent[1].1.contains("https://academy.kr/newsletter/unsubscribe"));
    }
}
