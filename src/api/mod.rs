pub mod plant_model_dto;
