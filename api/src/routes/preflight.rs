use actix_web::HttpResponse;

/// Answers CORS preflight requests. The CORS headers themselves are added to
/// every response by the application's default headers.
pub async fn preflight() -> HttpResponse {
    HttpResponse::Ok().body("ok")
}
