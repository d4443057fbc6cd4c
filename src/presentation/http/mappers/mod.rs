use crate::{domain::models::DeliveryRecord, presentation::http::responses::SentMessageDto};

pub fn map_delivery(record: &DeliveryRecord) -> SentMessageDto {
    SentMessageDto {
        id: record.external_id.clone(),
        sent_at: record.sent_at,
    }
}
