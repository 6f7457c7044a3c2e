use crate::api::attendance::{CheckInRequest, CheckOutRequest, TransitionResponse};
use crate::model::attendance::{AttendanceEvent, AttendanceStatus};
use crate::model::location::{IntegrityFlags, IntegritySignal, LocationSample};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Geomark Attendance API",
        version = "1.0.0",
        description = r#"
## Attendance marking with geolocation integrity

Daily check-in/check-out per user, one record per calendar day in the
organization's timezone, with plausibility signals on every transition.

### 🔹 Key Features
- **Check-in / Check-out**
  - Exactly one transition each per day; conflicts are definitive `409`s
- **Integrity signals**
  - Accuracy-radius and implied-travel-speed flags, advisory only
- **Dashboard feed**
  - Incremental cursor over committed transitions

### 📦 Response Format
- JSON-based RESTful responses

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::attendance::status,
        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::feed
    ),
    components(
        schemas(
            CheckInRequest,
            CheckOutRequest,
            TransitionResponse,
            AttendanceStatus,
            AttendanceEvent,
            LocationSample,
            IntegritySignal,
            IntegrityFlags
        )
    ),
    tags(
        (name = "Attendance", description = "Attendance marking APIs"),
    )
)]
pub struct ApiDoc;
