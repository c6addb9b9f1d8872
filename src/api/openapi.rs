// src/api/openapi.rs

//! OpenAPI description of the environment endpoints, served by the Swagger
//! UI at `/swagger/doc.json`.

use serde_json::{json, Value};

use super::ENVIRONMENTS_PATH;

/// Build the OpenAPI 3.0 document for the service
pub fn document() -> Value {
    let item = format!("{}/{{key}}", ENVIRONMENTS_PATH);

    json!({
        "openapi": "3.0.3",
        "info": {
            "title": "Ortelius Environment Microservice",
            "description": "RestAPI for the Environment Object",
            "version": env!("CARGO_PKG_VERSION"),
            "license": {
                "name": "Apache 2.0",
                "url": "http://www.apache.org/licenses/LICENSE-2.0.html"
            }
        },
        "tags": [{"name": "environment", "description": "Environment records"}],
        "paths": {
            ENVIRONMENTS_PATH: {
                "get": {
                    "tags": ["environment"],
                    "summary": "Get a List of Environments",
                    "operationId": "listEnvironments",
                    "responses": {
                        "200": {
                            "description": "Every stored Environment, possibly empty",
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "type": "array",
                                        "items": {"$ref": "#/components/schemas/Environment"}
                                    }
                                }
                            }
                        }
                    }
                },
                "post": {
                    "tags": ["environment"],
                    "summary": "Create an Environment",
                    "operationId": "createEnvironment",
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {
                                "schema": {"$ref": "#/components/schemas/Environment"}
                            }
                        }
                    },
                    "responses": {
                        "200": {
                            "description": "The stored record including its key",
                            "content": {
                                "application/json": {
                                    "schema": {"$ref": "#/components/schemas/Environment"}
                                }
                            }
                        },
                        "503": {
                            "description": "The body could not be parsed as an Environment",
                            "content": {"text/plain": {"schema": {"type": "string"}}}
                        }
                    }
                }
            },
            item: {
                "get": {
                    "tags": ["environment"],
                    "summary": "Get an Environment by name or key",
                    "operationId": "getEnvironment",
                    "parameters": [{
                        "name": "key",
                        "in": "path",
                        "required": true,
                        "description": "Environment name or _key",
                        "schema": {"type": "string"}
                    }],
                    "responses": {
                        "200": {
                            "description": "The matching Environment, or {} when nothing matches",
                            "content": {
                                "application/json": {
                                    "schema": {"$ref": "#/components/schemas/Environment"}
                                }
                            }
                        }
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "Environment": {
                    "type": "object",
                    "properties": {
                        "_key": {"type": "string"},
                        "name": {"type": "string"},
                        "objtype": {"type": "string", "example": "Environment"}
                    },
                    "additionalProperties": true
                }
            }
        }
    })
}
