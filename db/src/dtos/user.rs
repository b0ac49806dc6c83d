pub struct UserCreateRequest {
    pub name: String,
    pub email: String,
}
