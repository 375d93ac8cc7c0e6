//! In-memory stand-ins for every store and client behind `AppState`.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, Response},
};
use bytes::Bytes;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    artifacts::{
        repo::ArtifactStore,
        repo_types::{ArtifactWithOwner, ModelArtifact, NewArtifact},
    },
    auth::{
        jwt::{JwtKeys, SessionFlow},
        oauth::{OAuthError, OAuthProvider},
        repo::{StoreError, UserStore},
        repo_types::{
            AuthProvider, NewLocalUser, OAuthIdentity, Role, User, UserCredentials,
        },
    },
    detection::client::Detector,
    images::repo::ImageStore,
    state::{test_config, AppState},
    storage::StorageClient,
};

#[derive(Default)]
pub struct MemoryUserStore {
    rows: Mutex<Vec<UserCredentials>>,
}

impl MemoryUserStore {
    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn credentials(&self, email: &str) -> Option<UserCredentials> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.user.email == email)
            .cloned()
    }

    pub fn set_role(&self, email: &str, role: Role) {
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|r| r.user.email == email) {
            row.user.role = role;
        }
    }
}

fn provider_id_taken(rows: &[UserCredentials], identity: &OAuthIdentity) -> bool {
    rows.iter().any(|r| {
        r.user.email != identity.email
            && match identity.provider {
                AuthProvider::Google => r.user.google_id.as_deref() == Some(&identity.provider_id),
                AuthProvider::Github => r.user.github_id.as_deref() == Some(&identity.provider_id),
                AuthProvider::Local => false,
            }
    })
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert_local(&self, new: NewLocalUser) -> Result<User, StoreError> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|r| r.user.email == new.email) {
            return Err(StoreError::DuplicateEmail);
        }
        let user = User {
            id: Uuid::new_v4(),
            email: new.email,
            full_name: new.full_name,
            auth_provider: AuthProvider::Local,
            google_id: None,
            github_id: None,
            profile_picture: String::new(),
            role: Role::User,
            created_at: OffsetDateTime::now_utc(),
        };
        rows.push(UserCredentials {
            user: user.clone(),
            password_hash: Some(new.password_hash),
        });
        Ok(user)
    }

    async fn find_by_email_with_password(
        &self,
        email: &str,
    ) -> Result<Option<UserCredentials>, StoreError> {
        Ok(self.credentials(email))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().find(|r| r.user.id == id).map(|r| r.user.clone()))
    }

    async fn upsert_oauth_user(&self, identity: OAuthIdentity) -> Result<User, StoreError> {
        let mut rows = self.rows.lock().unwrap();
        if provider_id_taken(&rows, &identity) {
            return Err(StoreError::ProviderIdTaken("provider id"));
        }
        let picture = identity.profile_picture.clone().unwrap_or_default();

        if let Some(row) = rows.iter_mut().find(|r| r.user.email == identity.email) {
            let user = &mut row.user;
            user.auth_provider = identity.provider;
            match identity.provider {
                AuthProvider::Google => user.google_id = Some(identity.provider_id),
                AuthProvider::Github => user.github_id = Some(identity.provider_id),
                AuthProvider::Local => {}
            }
            if user.profile_picture.is_empty() {
                user.profile_picture = picture;
            }
            return Ok(user.clone());
        }

        let user = User {
            id: Uuid::new_v4(),
            email: identity.email,
            full_name: identity.full_name,
            auth_provider: identity.provider,
            google_id: (identity.provider == AuthProvider::Google)
                .then(|| identity.provider_id.clone()),
            github_id: (identity.provider == AuthProvider::Github)
                .then(|| identity.provider_id.clone()),
            profile_picture: picture,
            role: Role::User,
            created_at: OffsetDateTime::now_utc(),
        };
        rows.push(UserCredentials {
            user: user.clone(),
            password_hash: None,
        });
        Ok(user)
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> Result<(), StoreError> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|r| r.user.id == id) {
            row.password_hash = Some(password_hash.to_string());
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryImageStore {
    rows: Mutex<Vec<(Uuid, Vec<String>)>>,
    pub fail: bool,
}

#[async_trait]
impl ImageStore for MemoryImageStore {
    async fn append_image(&self, user_id: Uuid, url: &str) -> anyhow::Result<()> {
        anyhow::ensure!(!self.fail, "image store offline");
        let mut rows = self.rows.lock().unwrap();
        match rows.iter_mut().find(|(id, _)| *id == user_id) {
            Some((_, urls)) => urls.push(url.to_string()),
            None => rows.push((user_id, vec![url.to_string()])),
        }
        Ok(())
    }

    async fn list_images(&self, user_id: Uuid) -> anyhow::Result<Vec<String>> {
        anyhow::ensure!(!self.fail, "image store offline");
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .find(|(id, _)| *id == user_id)
            .map(|(_, urls)| urls.clone())
            .unwrap_or_default())
    }
}

pub struct MemoryArtifactStore {
    rows: Mutex<Vec<ModelArtifact>>,
    users: Arc<MemoryUserStore>,
}

impl MemoryArtifactStore {
    pub fn new(users: Arc<MemoryUserStore>) -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            users,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn insert(&self, new: NewArtifact) -> anyhow::Result<ModelArtifact> {
        let artifact = ModelArtifact {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            model_name: new.model_name,
            model_type: new.model_type,
            model_url: new.model_url,
            storage_key: new.storage_key,
            created_at: OffsetDateTime::now_utc(),
        };
        self.rows.lock().unwrap().push(artifact.clone());
        Ok(artifact)
    }

    async fn list_with_owner(&self) -> anyhow::Result<Vec<ArtifactWithOwner>> {
        let rows = self.rows.lock().unwrap().clone();
        let mut out = Vec::with_capacity(rows.len());
        for artifact in rows.into_iter().rev() {
            let owner = self.users.find_by_id(artifact.user_id).await?;
            let (username, user_email) = owner
                .map(|u| (u.full_name, u.email))
                .unwrap_or_default();
            out.push(ArtifactWithOwner {
                artifact,
                username,
                user_email,
            });
        }
        Ok(out)
    }

    async fn find(&self, id: Uuid) -> anyhow::Result<Option<ModelArtifact>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().find(|a| a.id == id).cloned())
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|a| a.id != id);
        Ok(rows.len() != before)
    }
}

/// Records puts and deletes; `fail` makes every call error.
pub struct MemoryStorage {
    bucket: &'static str,
    pub objects: Mutex<Vec<(String, Bytes, String)>>,
    pub fail: bool,
}

impl MemoryStorage {
    pub fn new(bucket: &'static str) -> Self {
        Self {
            bucket,
            objects: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects
            .lock()
            .unwrap()
            .iter()
            .map(|(k, _, _)| k.clone())
            .collect()
    }
}

#[async_trait]
impl StorageClient for MemoryStorage {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()> {
        anyhow::ensure!(!self.fail, "storage unavailable");
        self.objects
            .lock()
            .unwrap()
            .push((key.to_string(), body, content_type.to_string()));
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        anyhow::ensure!(!self.fail, "storage unavailable");
        self.objects.lock().unwrap().retain(|(k, _, _)| k != key);
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("http://storage.test/{}/{}", self.bucket, key)
    }
}

/// Provider that hands back a fixed identity for any code.
pub struct FakeOAuth {
    identity: Option<OAuthIdentity>,
}

impl FakeOAuth {
    fn new(provider: AuthProvider, id: &str, email: &str, name: &str) -> Self {
        Self {
            identity: Some(OAuthIdentity {
                provider,
                provider_id: id.into(),
                email: email.into(),
                full_name: name.into(),
                profile_picture: Some(format!("https://pics.example/{id}.png")),
            }),
        }
    }

    pub fn google(id: &str, email: &str, name: &str) -> Self {
        Self::new(AuthProvider::Google, id, email, name)
    }

    pub fn github(id: &str, email: &str, name: &str) -> Self {
        Self::new(AuthProvider::Github, id, email, name)
    }

    pub fn failing() -> Self {
        Self { identity: None }
    }

    pub fn with_picture(mut self, url: &str) -> Self {
        if let Some(identity) = self.identity.as_mut() {
            identity.profile_picture = Some(url.into());
        }
        self
    }
}

#[async_trait]
impl OAuthProvider for FakeOAuth {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn exchange_code(&self, code: &str) -> Result<String, OAuthError> {
        match self.identity {
            Some(_) => Ok(format!("access-{code}")),
            None => Err(OAuthError::ExchangeRefused("bad_verification_code".into())),
        }
    }

    async fn fetch_profile(&self, _access_token: &str) -> Result<OAuthIdentity, OAuthError> {
        self.identity.clone().ok_or(OAuthError::NoPrimaryEmail)
    }
}

/// Echoes its input back as the detection result.
#[derive(Default)]
pub struct FakeDetector {
    pub fail: bool,
}

#[async_trait]
impl Detector for FakeDetector {
    async fn detect(&self, image_url: &str, model: &str) -> anyhow::Result<serde_json::Value> {
        anyhow::ensure!(!self.fail, "detection service unreachable");
        Ok(serde_json::json!({
            "detections": [{ "box": [1.0, 2.0, 3.0, 4.0], "confidence": 0.9, "class": 0, "class_name": "person" }],
            "imageUrl": image_url,
            "model": model,
        }))
    }
}

pub struct Fakes {
    pub users: Arc<MemoryUserStore>,
    pub images: Arc<MemoryImageStore>,
    pub artifacts: Arc<MemoryArtifactStore>,
    pub image_storage: Arc<MemoryStorage>,
    pub model_storage: Arc<MemoryStorage>,
    pub github: Arc<FakeOAuth>,
    pub google: Arc<FakeOAuth>,
    pub detector: Arc<FakeDetector>,
}

impl Fakes {
    pub fn new() -> Self {
        let users = Arc::new(MemoryUserStore::default());
        Self {
            artifacts: Arc::new(MemoryArtifactStore::new(users.clone())),
            users,
            images: Arc::new(MemoryImageStore::default()),
            image_storage: Arc::new(MemoryStorage::new("minio-test")),
            model_storage: Arc::new(MemoryStorage::new("models")),
            github: Arc::new(FakeOAuth::github("github-1", "octo@x.com", "Octo Cat")),
            google: Arc::new(FakeOAuth::google("google-1", "a@x.com", "Google Name")),
            detector: Arc::new(FakeDetector::default()),
        }
    }

    pub fn with_failing_oauth(mut self) -> Self {
        self.github = Arc::new(FakeOAuth::failing());
        self.google = Arc::new(FakeOAuth::failing());
        self
    }

    pub fn with_failing_upstreams(mut self) -> Self {
        self.images = Arc::new(MemoryImageStore {
            fail: true,
            ..Default::default()
        });
        let mut storage = MemoryStorage::new("minio-test");
        storage.fail = true;
        self.image_storage = Arc::new(storage);
        self.detector = Arc::new(FakeDetector { fail: true });
        self
    }

    pub fn state(&self) -> AppState {
        let config = Arc::new(test_config());
        AppState {
            keys: JwtKeys::new(&config.jwt),
            config,
            users: self.users.clone(),
            images: self.images.clone(),
            artifacts: self.artifacts.clone(),
            image_storage: self.image_storage.clone(),
            model_storage: self.model_storage.clone(),
            github: Some(self.github.clone() as Arc<dyn OAuthProvider>),
            google: Some(self.google.clone() as Arc<dyn OAuthProvider>),
            detector: self.detector.clone(),
        }
    }
}

impl Fakes {
    /// Stores a user with the given role and returns a `token=...` cookie pair for it.
    pub async fn user_cookie(&self, email: &str, role: Role) -> String {
        let user = self
            .users
            .insert_local(NewLocalUser {
                email: email.into(),
                full_name: format!("{} name", email.split('@').next().unwrap()),
                password_hash: "unused".into(),
            })
            .await
            .unwrap();
        self.users.set_role(email, role);
        let token = self
            .state()
            .keys
            .issue_for(SessionFlow::Local, user.id, &user.email)
            .unwrap();
        format!("token={token}")
    }
}

/// One multipart section; `file` carries filename and content type.
pub struct Part<'a> {
    pub name: &'a str,
    pub file: Option<(&'a str, &'a str)>,
    pub data: &'a [u8],
}

impl<'a> Part<'a> {
    pub fn text(name: &'a str, value: &'a str) -> Self {
        Self {
            name,
            file: None,
            data: value.as_bytes(),
        }
    }

    pub fn file(name: &'a str, filename: &'a str, content_type: &'a str, data: &'a [u8]) -> Self {
        Self {
            name,
            file: Some((filename, content_type)),
            data,
        }
    }
}

const BOUNDARY: &str = "X-VISIONAUTH-TEST-BOUNDARY";

pub fn multipart_request(uri: &str, cookie: Option<&str>, parts: &[Part<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part.file {
            Some((filename, content_type)) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                    part.name, filename, content_type
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", part.name)
                    .as_bytes(),
            ),
        }
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    let mut req = Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(cookie) = cookie {
        req = req.header(header::COOKIE, cookie);
    }
    req.body(Body::from(body)).unwrap()
}

pub fn request(method: &str, uri: &str, cookie: Option<&str>, json: Option<serde_json::Value>) -> Request<Body> {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        req = req.header(header::COOKIE, cookie);
    }
    match json {
        Some(v) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(v.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    }
}

pub async fn body_json(res: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
