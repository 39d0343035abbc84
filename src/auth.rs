use actix_web::{dev, http::header, web, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};
use tracing::warn;

use crate::error::ApiError;

/// Shared secret n8n sends back on its callback. `None` leaves the callback open.
#[derive(Debug, Clone, Default)]
pub struct CallbackToken(pub Option<String>);

/// Proof that the request carried `Authorization: Bearer <token>` matching [`CallbackToken`]
pub struct N8nCaller;

impl FromRequest for N8nCaller {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        let expected = req.app_data::<web::Data<CallbackToken>>()
            .and_then(|token| token.0.clone());

        let Some(expected) = expected else {
            return ready(Ok(N8nCaller));
        };

        let presented = req.headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));

        if presented != Some(expected.as_str()) {
            warn!("Rejected n8n callback with a missing or wrong token");
            return ready(Err(ApiError::Unauthorized));
        }

        ready(Ok(N8nCaller))
    }
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, post, test, App, Responder};

    use super::*;

    #[post("/")]
    async fn test_handler(_caller: N8nCaller) -> impl Responder {
        ""
    }

    #[actix_web::test]
    async fn test_extractor() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(CallbackToken(Some("s3cret".to_string()))))
                .service(test_handler)
        ).await;

        {
            let unauthorized_req = test::TestRequest::post()
                .uri("/")
                .to_request();

            let response = test::call_service(&app, unauthorized_req).await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }

        {
            let wrong_req = test::TestRequest::post()
                .uri("/")
                .insert_header(("Authorization", "Bearer wrong"))
                .to_request();

            let response = test::call_service(&app, wrong_req).await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }

        {
            let authorized_req = test::TestRequest::post()
                .uri("/")
                .insert_header(("Authorization", "Bearer s3cret"))
                .to_request();

            let response = test::call_service(&app, authorized_req).await;
            assert_eq!(response.status(), StatusCode::OK);
        }
    }

    #[actix_web::test]
    async fn test_open_without_token() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(CallbackToken(None)))
                .service(test_handler)
        ).await;

        let req = test::TestRequest::post().uri("/").to_request();

        let response = test::call_service(&app, req).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
