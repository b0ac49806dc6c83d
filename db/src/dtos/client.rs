use uuid::Uuid;

pub struct ClientCreateRequest {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
}
