// SPDX-License-Identifier: Apache-2.0

use serde_json::{json, Value};

use crate::errors::ApiErrorCode;
use crate::API_ERROR_SCHEMA_REF;

fn error_response(description: &str) -> Value {
    json!({
        "description": description,
        "content": {"application/json": {"schema": {"$ref": API_ERROR_SCHEMA_REF}}}
    })
}

fn body(schema: &str) -> Value {
    json!({
        "required": true,
        "content": {"application/json": {"schema": {"$ref": format!("#/components/schemas/{schema}")}}}
    })
}

fn ok(description: &str) -> Value {
    json!({"description": description})
}

fn authed(mut op: Value) -> Value {
    op["security"] = json!([{"bearerAuth": []}]);
    op["responses"]["401"] = error_response("missing or invalid session");
    op
}

fn admin(op: Value) -> Value {
    let mut op = authed(op);
    op["responses"]["403"] = error_response("caller is not an admin");
    op
}

fn string_props(fields: &[&str]) -> Value {
    let mut props = serde_json::Map::new();
    for field in fields {
        props.insert((*field).to_string(), json!({"type": "string"}));
    }
    Value::Object(props)
}

/// Paths are listed without the `/api` prefix; every route is served under
/// both.
#[must_use]
pub fn openapi_v1_spec() -> Value {
    let codes: Vec<&str> = ApiErrorCode::ALL.iter().map(|c| c.as_str()).collect();
    json!({
      "openapi": "3.0.3",
      "info": {"title": "Hope-AI API", "version": "v1"},
      "paths": {
        "/healthz": {"get": {"responses": {"200": ok("alive")}}},
        "/auth/request-otp": {"post": {
          "requestBody": body("RequestOtpRequest"),
          "responses": {
            "200": ok("code sent"),
            "400": error_response("missing phone number or country code"),
            "429": error_response("too many code requests for this number"),
            "500": error_response("verification provider failure")
          }
        }},
        "/auth/verify-otp": {"post": {
          "requestBody": body("VerifyOtpRequest"),
          "responses": {
            "200": ok("code approved"),
            "400": error_response("missing fields or code not approved"),
            "500": error_response("verification provider failure")
          }
        }},
        "/auth/register": {"post": {
          "requestBody": body("RegisterRequest"),
          "responses": {
            "201": ok("account created and session issued"),
            "400": error_response("validation failure or invalid code"),
            "409": error_response("phone number or email already registered")
          }
        }},
        "/auth/login": {"post": {
          "requestBody": body("LoginRequest"),
          "responses": {
            "200": ok("session issued"),
            "400": error_response("missing identifier or password"),
            "401": error_response("invalid credentials")
          }
        }},
        "/chats/create": {"post": authed(json!({
          "requestBody": body("CreateRoomRequest"),
          "responses": {
            "201": ok("room created"),
            "403": error_response("only users may open rooms"),
            "404": error_response("doctor not found")
          }
        }))},
        "/chats/openai": {"post": authed(json!({
          "requestBody": body("CompletionRequest"),
          "responses": {
            "200": ok("completion text and sensitivity flag"),
            "500": error_response("completion provider failure")
          }
        }))},
        "/chats/{roomId}": {"get": authed(json!({
          "parameters": [{"name": "roomId", "in": "path", "required": true, "schema": {"type": "string"}}],
          "responses": {
            "200": ok("room transcript"),
            "403": error_response("caller is not a participant"),
            "404": error_response("room not found")
          }
        }))},
        "/admin/users": {"get": admin(json!({"responses": {"200": ok("non-admin accounts")}}))},
        "/admin/users/{id}": {"delete": admin(json!({
          "parameters": [{"name": "id", "in": "path", "required": true, "schema": {"type": "string"}}],
          "responses": {"200": ok("account removed"), "404": error_response("no such account")}
        }))},
        "/admin/doctors": {
          "get": admin(json!({"responses": {"200": ok("doctor accounts")}})),
          "post": admin(json!({
            "requestBody": body("CreateDoctorRequest"),
            "responses": {
              "201": ok("doctor created"),
              "400": error_response("validation failure"),
              "409": error_response("duplicate phone number or email")
            }
          }))
        },
        "/admin/doctors/{id}": {"put": admin(json!({
          "parameters": [{"name": "id", "in": "path", "required": true, "schema": {"type": "string"}}],
          "requestBody": body("UpdateDoctorStatusRequest"),
          "responses": {"200": ok("status updated"), "404": error_response("no such doctor")}
        }))},
        "/admin/admins": {"post": admin(json!({
          "requestBody": body("CreateAdminRequest"),
          "responses": {
            "201": ok("admin created"),
            "400": error_response("validation failure"),
            "409": error_response("duplicate phone number, email or admin phone")
          }
        }))},
        "/admin/profile": {"put": admin(json!({
          "requestBody": body("UpdateProfileRequest"),
          "responses": {"200": ok("profile updated"), "404": error_response("admin record missing")}
        }))},
        "/admin/chats": {"get": admin(json!({"responses": {"200": ok("all rooms")}}))},
        "/admin/chats/sensitive": {"get": admin(json!({"responses": {"200": ok("rooms with a flagged message")}}))},
        "/ws": {"get": {
          "description": "WebSocket relay. Session via Authorization header or `token` query parameter.",
          "responses": {"101": ok("switching protocols"), "401": error_response("missing or invalid session")}
        }}
      },
      "components": {
        "securitySchemes": {"bearerAuth": {"type": "http", "scheme": "bearer", "bearerFormat": "JWT"}},
        "schemas": {
          "ApiError": {
            "type": "object",
            "required": ["code", "error", "success"],
            "additionalProperties": false,
            "properties": {
              "code": {"$ref": "#/components/schemas/ApiErrorCode"},
              "details": {"type": "object"},
              "error": {"type": "string"},
              "success": {"type": "boolean"}
            }
          },
          "ApiErrorCode": {"type": "string", "enum": codes},
          "CompletionRequest": {"type": "object", "required": ["message"], "properties": string_props(&["message"])},
          "CreateAdminRequest": {
            "type": "object",
            "required": ["adminPhone", "email", "name", "password", "phoneNumber"],
            "properties": string_props(&["adminPhone", "countryCode", "email", "name", "password", "phoneNumber"])
          },
          "CreateDoctorRequest": {
            "type": "object",
            "required": ["name", "password", "phoneNumber"],
            "properties": string_props(&["countryCode", "email", "name", "password", "phoneNumber"])
          },
          "CreateRoomRequest": {"type": "object", "required": ["doctorId"], "properties": string_props(&["doctorId"])},
          "LoginRequest": {"type": "object", "required": ["password"], "properties": string_props(&["email", "password", "phoneNumber"])},
          "RegisterRequest": {
            "type": "object",
            "required": ["email", "name", "otp", "password", "phoneNumber"],
            "properties": string_props(&["countryCode", "email", "name", "otp", "password", "phoneNumber"])
          },
          "RequestOtpRequest": {
            "type": "object",
            "required": ["countryCode", "phoneNumber"],
            "properties": string_props(&["countryCode", "phoneNumber"])
          },
          "UpdateDoctorStatusRequest": {"type": "object", "required": ["isActive"], "properties": {"isActive": {"type": "boolean"}}},
          "UpdateProfileRequest": {"type": "object", "properties": string_props(&["adminPhone", "email", "name", "phoneNumber"])},
          "VerifyOtpRequest": {
            "type": "object",
            "required": ["countryCode", "otp", "phoneNumber"],
            "properties": string_props(&["countryCode", "otp", "phoneNumber"])
          }
        }
      }
    })
}
