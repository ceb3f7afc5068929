use actix_web::{
    cookie::Cookie,
    http::header,
    web::{self, Data},
    HttpRequest, HttpResponse,
};
use tera::Tera;

use crate::{
    error::AppError,
    fetch::MarketData,
    flow::{self, Transition},
    models::SelectionForm,
    session::SessionStore,
    templates,
};

/// Shared by every worker. Per-visitor data lives in `sessions`.
pub struct AppState<M> {
    pub market: M,
    pub sessions: SessionStore,
    pub templates: Tera,
}

pub fn configure<M: MarketData + 'static>(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(root))
        .service(
            web::resource("/index")
                .route(web::get().to(show_form::<M>))
                .route(web::post().to(submit_form::<M>)),
        )
        .route("/graph", web::get().to(graph::<M>));
}

async fn root() -> HttpResponse {
    see_other("/index", None)
}

async fn show_form<M: MarketData>(
    req: HttpRequest,
    state: Data<AppState<M>>,
) -> Result<HttpResponse, AppError> {
    let session = state.sessions.resolve(&req).await;
    let flashes = state.sessions.take_flashes(&session.id).await;
    let body = templates::index_page(&state.templates, &flashes)?;

    let mut response = HttpResponse::Ok();
    if let Some(cookie) = session.cookie {
        response.cookie(cookie);
    }
    Ok(response.content_type("text/html; charset=utf-8").body(body))
}

async fn submit_form<M: MarketData>(
    req: HttpRequest,
    state: Data<AppState<M>>,
    form: Result<web::Form<SelectionForm>, actix_web::Error>,
) -> HttpResponse {
    let session = state.sessions.resolve(&req).await;

    let form = match form {
        Ok(form) => form.into_inner(),
        Err(err) => {
            log::info!("unreadable form submission: {err}");
            state.sessions.flash(&session.id, flow::INVALID_TICKER).await;
            return see_other("/index", session.cookie);
        }
    };

    match flow::submit(&state.market, form).await {
        Transition::Ready(prepared) => {
            state.sessions.put_prepared(&session.id, prepared).await;
            see_other("/graph", session.cookie)
        }
        Transition::AwaitingInput { message, .. } => {
            state.sessions.flash(&session.id, message).await;
            see_other("/index", session.cookie)
        }
    }
}

async fn graph<M: MarketData>(
    req: HttpRequest,
    state: Data<AppState<M>>,
) -> Result<HttpResponse, AppError> {
    let session = state.sessions.resolve(&req).await;

    let Some(prepared) = state.sessions.take_prepared(&session.id).await else {
        state.sessions.flash(&session.id, flow::NOTHING_TO_SHOW).await;
        return Ok(see_other("/index", session.cookie));
    };

    let page = match flow::present(&prepared) {
        Ok(page) => page,
        Err(err @ AppError::Template(_)) => return Err(err),
        Err(err) => {
            log::warn!("could not draw chart: {err}");
            state.sessions.flash(&session.id, flow::user_message(&err)).await;
            return Ok(see_other("/index", session.cookie));
        }
    };
    let body = templates::graph_page(&state.templates, &page)?;
    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(body))
}

fn see_other(location: &str, cookie: Option<Cookie<'static>>) -> HttpResponse {
    let mut response = HttpResponse::SeeOther();
    response.insert_header((header::LOCATION, location));
    if let Some(cookie) = cookie {
        response.cookie(cookie);
    }
    response.finish()
}
