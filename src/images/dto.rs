use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedImageResponse {
    pub message: &'static str,
    pub image_url: String,
}

#[derive(Debug, Serialize)]
pub struct UserImagesResponse {
    pub images: Vec<String>,
}
