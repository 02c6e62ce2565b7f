//! Static classification tables: tracking domains, asset extensions, MIME families.

/// Analytics, tracking, session-replay, error-reporting, chat-widget, A/B,
/// attribution, APM and ad-network domains. Matched exactly or as a parent domain.
pub(super) const TRACKING_DOMAINS: &[&str] = &[
    // Google
    "google-analytics.com",
    "googletagmanager.com",
    "doubleclick.net",
    "analytics.google.com",
    "googleadservices.com",
    "googlesyndication.com",
    "googletagservices.com",
    // Meta
    "connect.facebook.net",
    "facebook-hardware.com",
    "fbcdn.net",
    "fb.me",
    "facebook.net",
    // Product analytics
    "segment.com",
    "segment.io",
    "mixpanel.com",
    "mxpnl.com",
    "hotjar.com",
    "hotjar.io",
    "amplitude.com",
    "heap.io",
    "heapanalytics.com",
    // Session replay & heatmaps
    "fullstory.com",
    "logrocket.com",
    "logrocket.io",
    "lr-intake.com",
    "mouseflow.com",
    "luckyorange.com",
    "inspectlet.com",
    "smartlook.com",
    "sessioncam.com",
    "crazyegg.com",
    // Error tracking
    "sentry.io",
    "sentry.dev",
    "sentry-cdn.com",
    "rollbar.com",
    "bugsnag.com",
    "trackjs.com",
    "raygun.io",
    "airbrake.io",
    // Support chat widgets
    "intercom.io",
    "intercom.com",
    "drift.com",
    "driftt.com",
    "zendesk.com",
    "zdassets.com",
    "livechatinc.com",
    "livechat.com",
    "olark.com",
    "crisp.chat",
    "tawk.to",
    // A/B testing & feature flags
    "optimizely.com",
    "vwo.com",
    "visualwebsiteoptimizer.com",
    "split.io",
    "launchdarkly.com",
    "statsigapi.net",
    // Attribution
    "branch.io",
    "app.link",
    "bnc.lt",
    "adjust.com",
    "appsflyer.com",
    "kochava.com",
    "singular.net",
    // APM & monitoring
    "newrelic.com",
    "nr-data.net",
    "datadoghq.com",
    "datadog-logs.com",
    "browser-intake-datadoghq.com",
    "elastic-cloud.com",
    "splunk.com",
    // Advertising
    "adnxs.com",
    "adsrvr.org",
    "advertising.com",
    "criteo.com",
    "criteo.net",
    "outbrain.com",
    "taboola.com",
    "scorecardresearch.com",
    "quantserve.com",
    "rubiconproject.com",
    "pubmatic.com",
    // Onboarding overlays
    "pendo.io",
    "walkme.com",
];

/// URL schemes produced by the browser itself rather than the site.
pub(super) const BROWSER_INTERNAL_PREFIXES: &[&str] =
    &["chrome://", "chrome-extension://", "about:", "data:", "blob:"];

/// Path-segment patterns of tracking beacons.
pub(super) const TRACKING_PATH_PATTERNS: &[&str] = &[
    r"(?:^|/)(?:beacon|pixel|track|tracking|collect|analytics|telemetry|impressions?|pageview|conversion)(?:/|$|\.)",
    r"(?:^|/)(?:__utm|t|p)\.gif$",
];

pub(super) const STATIC_EXTENSIONS: &[&str] = &[
    ".js", ".mjs", ".css", ".map", ".woff", ".woff2", ".ttf", ".otf", ".eot", ".svg", ".png",
    ".jpg", ".jpeg", ".gif", ".ico", ".webp", ".avif", ".bmp", ".mp4", ".webm", ".mov", ".mp3",
    ".m4a", ".ogg",
];

/// Content-type prefixes of static assets.
pub(super) const STATIC_MIME_PREFIXES: &[&str] = &[
    "text/css",
    "application/javascript",
    "text/javascript",
    "application/x-javascript",
    "application/ecmascript",
    "font/",
    "application/font",
    "application/x-font",
    "image/",
    "video/",
    "audio/",
];

/// Content-type fragments that indicate structured data.
pub(super) const STRUCTURED_MIME_HINTS: &[&str] = &[
    "json",
    "xml",
    "graphql",
    "protobuf",
    "grpc",
    "msgpack",
    "x-www-form-urlencoded",
    "event-stream",
];

/// Path fragments typical of API routes.
pub(super) const API_PATH_HINTS: &[&str] = &[
    "/api/", "/v1/", "/v2/", "/v3/", "/graphql", "/rest/", "/data/", "/rpc/",
];

/// Bodies below this size with an image MIME type are treated as beacons.
pub(super) const PIXEL_MAX_BYTES: u64 = 100;
